pub mod extractor;
pub mod jwt;
pub mod middleware;

pub use extractor::CurrentUser;
