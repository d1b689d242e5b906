pub mod notice_sink;
pub mod status_sink;
pub mod watched_sink;
