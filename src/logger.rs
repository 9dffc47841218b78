use simplelog::{Config, ConfigBuilder, LevelFilter, SimpleLogger};

pub fn init(verbose: bool) {
    let level = if verbose { LevelFilter::Info } else { LevelFilter::Warn };
    let _ = SimpleLogger::init(level, config());
}

fn config() -> Config {
    ConfigBuilder::new()
        .add_filter_allow_str("nutrichef")
        .build()
}
