pub mod login_guard;

pub use login_guard::LoginGuard;
