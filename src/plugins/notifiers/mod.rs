// Notifier plugin implementations
pub mod gotify;
pub mod serverchan;
pub mod wxpush;

pub use gotify::GotifyNotifier;
pub use serverchan::ServerChanNotifier;
pub use wxpush::WxPushNotifier;
