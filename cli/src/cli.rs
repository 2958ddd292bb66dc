mod commands;
mod histogram;

use std::io::{self, BufRead, Write};
use std::rc::Rc;

use anyhow::{Context as _, Result, anyhow};
use sampleviz_core::stats::{chi_squared_uniform, linear_regression, mean_and_std};
use sampleviz_core::{
    ManualScheduler, RunnerPhase, Scheduler, StandardSimulation, VisualKind,
};
use tracing::info;

use crate::presets::PresetCatalog;
use commands::{CommandRegistry, Context};

pub const DEFAULT_RUN_FRAMES: usize = 60;
const HISTOGRAM_ROWS: usize = 20;
const HISTOGRAM_WIDTH: usize = 50;

struct ActiveSimulation {
    name: String,
    kind: VisualKind,
    simulation: StandardSimulation,
}

/// REPL state: one manual clock shared by whichever preset is active.
pub struct Session {
    catalog: PresetCatalog,
    scheduler: Rc<ManualScheduler>,
    active: Option<ActiveSimulation>,
}

impl Session {
    pub fn new(catalog: PresetCatalog) -> Self {
        Self {
            catalog,
            scheduler: Rc::new(ManualScheduler::new()),
            active: None,
        }
    }

    pub fn catalog(&self) -> &PresetCatalog {
        &self.catalog
    }

    pub fn frame(&self) -> u64 {
        self.scheduler.now_millis() / self.scheduler.frame_millis().max(1)
    }

    pub fn use_preset(&mut self, name: &str) -> Result<()> {
        let preset = self.catalog.get(name)?.clone();
        let scheduler: Rc<dyn Scheduler> = self.scheduler.clone();
        let simulation = preset
            .build(scheduler, None, None)
            .with_context(|| format!("プリセット {name} からの構築に失敗しました"))?;
        info!(preset = name, kind = %preset.kind, "プリセットを切り替え");
        // dropping the previous simulation cancels its pending frame
        self.active = Some(ActiveSimulation {
            name: name.to_owned(),
            kind: preset.kind,
            simulation,
        });
        Ok(())
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.name.as_str())
    }

    pub fn kind(&self) -> Option<VisualKind> {
        self.active.as_ref().map(|active| active.kind)
    }

    pub fn simulation(&self) -> Result<&StandardSimulation> {
        self.active
            .as_ref()
            .map(|active| &active.simulation)
            .ok_or_else(|| anyhow!("先に use <プリセット> で可視化を選択してください。"))
    }

    /// Advances the shared clock; returns how many callbacks fired.
    pub fn advance_frames(&self, frames: usize) -> usize {
        self.scheduler.run_frames(frames)
    }
}

pub fn run(session: &mut Session) -> Result<()> {
    print_intro(session);
    let registry = CommandRegistry::default();
    let stdin = io::stdin();

    loop {
        print!("frame {}> ", session.frame());
        io::stdout()
            .flush()
            .context("プロンプトのフラッシュに失敗しました")?;

        let mut line = String::new();
        let bytes = stdin
            .lock()
            .read_line(&mut line)
            .context("入力の読み込みに失敗しました")?;

        if bytes == 0 {
            println!("入力が終了したため終了します。");
            return Ok(());
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let mut ctx = Context::new(session);
        if let Err(error) = registry.execute_input(&mut ctx, trimmed) {
            println!("エラー: {error}");
        }
    }
}

fn print_intro(session: &Session) {
    println!("サンプリング可視化シミュレーターへようこそ。");
    println!("プリセット {} 件を読み込みました。", session.catalog().len());
    if let Some(name) = session.active_name() {
        println!("現在のプリセット: {name}");
    }
    println!("コマンド例: step / run 120 / show / stats / use dice-sum");
    println!("help で利用可能なコマンド一覧を表示します。");
}

pub(crate) fn print_help() {
    println!("利用可能なコマンド:");
    println!("  presets               プリセット一覧を表示");
    println!("  use <プリセット>      可視化を切り替える");
    println!("  step                  1フレーム分のサンプルを生成");
    println!("  run [フレーム数]      実行を開始して指定フレーム進める (既定 {DEFAULT_RUN_FRAMES})");
    println!("  stop                  実行を停止");
    println!("  reset                 ヒストグラムをリセット");
    println!("  count <n>             1サンプルあたりの試行回数を設定");
    println!("  sides <n|none>        サイコロの面数を設定");
    println!("  logx / logy           軸の対数表示を切り替え");
    println!("  show                  ヒストグラムを表示");
    println!("  stats                 統計量を表示");
    println!("  info                  現在の設定を表示");
    println!("  dump                  スナップショットをJSONで出力");
    println!("  quit                  終了");
}

pub(crate) fn print_presets(session: &Session) {
    println!("プリセット一覧:");
    for (name, preset) in session.catalog().iter() {
        let marker = if session.active_name() == Some(name) {
            "*"
        } else {
            " "
        };
        let sides = preset
            .sides
            .map(|sides| format!(" d{sides}"))
            .unwrap_or_default();
        println!(
            "{marker} {name:<16} {kind:<24} count={count}{sides}",
            kind = preset.kind.key(),
            count = preset.count
        );
    }
}

pub(crate) fn print_info(session: &Session) -> Result<()> {
    let simulation = session.simulation()?;
    let params = simulation.params();
    let range = simulation.range();
    println!(
        "-- {} ({}) --",
        session.active_name().unwrap_or("-"),
        session.kind().map(|kind| kind.key()).unwrap_or("-")
    );
    println!("{}", simulation.info_text());
    println!("範囲: [{:.4}, {:.4}] / ビン数 {}", range.min, range.max, simulation.bins());
    println!(
        "対数表示: x={} y={}",
        on_off(params.log_x),
        on_off(params.log_y)
    );
    println!("状態: {} ({})", phase_label(simulation.snapshot().phase), simulation.run_label());
    Ok(())
}

pub(crate) fn print_histogram(session: &Session) -> Result<()> {
    let snapshot = session.simulation()?.snapshot();
    for line in histogram::render(&snapshot.counts, HISTOGRAM_ROWS, HISTOGRAM_WIDTH) {
        println!("{line}");
    }
    Ok(())
}

pub(crate) fn print_stats(session: &Session) -> Result<()> {
    let simulation = session.simulation()?;
    let snapshot = simulation.snapshot();
    println!(
        "状態 {} / 合計 {} / 採用 {} / 範囲外 {}",
        phase_label(snapshot.phase),
        snapshot.total,
        snapshot.accepted(),
        snapshot.rejected
    );

    let samples = simulation.samples();
    if !samples.is_empty() {
        let (mean, std) = mean_and_std(&samples);
        println!("標本平均 {mean:.4} / 標準偏差 {std:.4} (n={})", samples.len());
    }

    let params = simulation.params();
    match session.kind() {
        Some(VisualKind::Uniform) if snapshot.accepted() > 0 => {
            let chi2 = chi_squared_uniform(&snapshot.counts);
            println!(
                "一様性 χ² = {chi2:.2} (自由度 {})",
                snapshot.counts.len().saturating_sub(1)
            );
        }
        Some(VisualKind::Normal) => {
            let count = f64::from(params.count);
            let (mean, variance) = match params.sides {
                Some(sides) => {
                    let sides = f64::from(sides);
                    ((sides + 1.0) / 2.0, (sides * sides - 1.0) / 12.0)
                }
                None => (0.5, 1.0 / 12.0),
            };
            println!(
                "理論値: 平均 {:.4} / 標準偏差 {:.4}",
                count * mean,
                (count * variance).sqrt()
            );
        }
        Some(VisualKind::LogNormal) if !samples.is_empty() => {
            let logs: Vec<f64> = samples.iter().map(|value| value.ln()).collect();
            let (mean, std) = mean_and_std(&logs);
            println!(
                "ln(積): 平均 {mean:.4} / 標準偏差 {std:.4} (理論値 {:.4} / {:.4})",
                -f64::from(params.count),
                f64::from(params.count).sqrt()
            );
        }
        Some(VisualKind::Sigmoid) if snapshot.accepted() > 0 => {
            let half = snapshot.accepted() as f64 / 2.0;
            if let Some(idx) = snapshot.stacks.iter().position(|&stack| stack >= half) {
                let range = simulation.range();
                let width = range.span() / simulation.bins() as f64;
                println!(
                    "累積分布の中央値 ≈ {:.3} (理論値 {:.3})",
                    range.min + (idx as f64 + 0.5) * width,
                    f64::from(params.count) / 2.0
                );
            }
        }
        Some(VisualKind::PreferentialAttachment) => {
            let (xs, ys): (Vec<f64>, Vec<f64>) = snapshot
                .counts
                .iter()
                .enumerate()
                .skip(1)
                .take(9)
                .filter(|(_, count)| **count > 0)
                .map(|(idx, count)| (((idx + 1) as f64).ln(), (*count as f64).ln()))
                .unzip();
            if xs.len() >= 2 {
                let fit = linear_regression(&xs, &ys);
                println!(
                    "規模 2-10 の両対数傾き {:.3} (R² {:.3})",
                    fit.slope, fit.r2
                );
            }
        }
        _ => {}
    }
    Ok(())
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

fn phase_label(phase: RunnerPhase) -> &'static str {
    match phase {
        RunnerPhase::Idle => "待機中",
        RunnerPhase::Running => "実行中",
        RunnerPhase::Stopped => "停止",
        RunnerPhase::Completed => "完了",
    }
}
