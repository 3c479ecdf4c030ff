/// 初始化日志，默认级别info，可用`RUST_LOG`覆盖
pub fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}
