mod cli;
mod presets;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use presets::PresetCatalog;

const EMBEDDED_PRESETS: &str = include_str!("../../config/presets.yaml");

fn main() -> Result<()> {
    init_tracing();

    let catalog = load_catalog()?;
    let initial = std::env::args()
        .nth(1)
        .or_else(|| catalog.default_name().map(str::to_owned));
    let mut session = cli::Session::new(catalog);
    if let Some(name) = initial {
        session.use_preset(&name)?;
    }

    cli::run(&mut session)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_catalog() -> Result<PresetCatalog> {
    let Some(config_path) = resolve_config_path()? else {
        warn!("config/presets.yaml が見つからないため組み込みのプリセットを使います");
        return PresetCatalog::from_yaml_str(EMBEDDED_PRESETS)
            .context("組み込みプリセットの解析に失敗しました");
    };

    let text = fs::read_to_string(&config_path).with_context(|| {
        format!(
            "プリセットファイルを開けません: {}",
            config_path.display()
        )
    })?;
    PresetCatalog::from_yaml_str(&text).with_context(|| {
        format!(
            "プリセットファイルの解析に失敗しました: {}",
            config_path.display()
        )
    })
}

fn resolve_config_path() -> Result<Option<PathBuf>> {
    let cwd = std::env::current_dir().context("カレントディレクトリの取得に失敗しました")?;
    let candidates = [
        cwd.join("config").join("presets.yaml"),
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("config")
            .join("presets.yaml"),
    ];

    Ok(candidates.into_iter().find(|path| path.exists()))
}
