pub mod auth_http;
pub mod flag_file;
pub mod payment_http;
pub mod retry;

pub use auth_http::HttpAuthAdapter;
pub use flag_file::FileFlagStore;
pub use payment_http::HttpPaymentAdapter;
pub use retry::RetryPolicy;
