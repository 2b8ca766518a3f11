//! Page Components

mod callback;
mod cancel;
mod home;
mod pricing;
mod success;

pub use callback::CallbackPage;
pub use cancel::CancelPage;
pub use home::HomePage;
pub use pricing::PricingPage;
pub use success::SuccessPage;
