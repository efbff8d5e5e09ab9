mod automation;
mod capture;
mod error;
mod scrape;
mod session;

pub use automation::{ChromiumLauncher, ChromiumSession};
pub use capture::MediaCandidates;
pub use error::{BrowserError, BrowserResult};
pub use scrape::{PageScraper, ScrapedPage};
pub use session::{BrowserSession, BrowserSessionFactory, ObservedResponse, ViewportSpec};
