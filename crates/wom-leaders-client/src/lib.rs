pub mod hiscore;
pub mod wom;

pub use hiscore::HiscoreWebClient;
pub use wom::WomClient;
