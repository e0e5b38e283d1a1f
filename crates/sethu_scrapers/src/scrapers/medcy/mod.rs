//! Medcy IVF (medcyivf.in), a partner clinic whose blog and doctor profiles
//! are republished on the site.

pub mod blog;
pub mod doctors;

pub use blog::MedcyBlogScraper;
pub use doctors::MedcyDoctorsScraper;

pub const SITE: &str = "medcyivf.in";
pub const BASE_URL: &str = "https://medcyivf.in";
