use std::collections::HashMap;
use std::process;

use anyhow::{Context as _, Result, anyhow, bail, ensure};

use super::{
    DEFAULT_RUN_FRAMES, Session, print_help, print_histogram, print_info, print_presets,
    print_stats,
};

pub struct Context<'a> {
    session: &'a mut Session,
}

impl<'a> Context<'a> {
    pub fn new(session: &'a mut Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &*self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut *self.session
    }
}

pub struct Args<'a> {
    tokens: Vec<&'a str>,
    index: usize,
}

impl<'a> Args<'a> {
    pub fn new(tokens: Vec<&'a str>) -> Self {
        Self { tokens, index: 0 }
    }

    pub fn next(&mut self) -> Option<&'a str> {
        let value = self.tokens.get(self.index).copied()?;
        self.index += 1;
        Some(value)
    }

    pub fn next_required(&mut self, message: &str) -> Result<&'a str> {
        self.next().ok_or_else(|| anyhow!(message.to_owned()))
    }
}

pub trait Command {
    fn name() -> &'static str;
    fn execute(ctx: &mut Context<'_>, args: Args<'_>) -> Result<()>;
}

type CommandFn = for<'a> fn(&mut Context<'a>, Args<'a>) -> Result<()>;

pub struct CommandRegistry {
    handlers: HashMap<&'static str, CommandFn>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register<C: Command>(&mut self) {
        let name = C::name();
        if self.handlers.insert(name, C::execute).is_some() {
            panic!("重複したコマンド登録です: {name}");
        }
    }

    pub fn dispatch<'a>(&self, command: &str, ctx: &mut Context<'a>, args: Args<'a>) -> Result<()> {
        match self.handlers.get(command) {
            Some(handler) => handler(ctx, args),
            None => bail!("未対応のコマンドです: {command}. help で一覧を確認してください。"),
        }
    }

    pub fn execute_input<'a>(&self, ctx: &mut Context<'a>, input: &'a str) -> Result<()> {
        let mut parts = input.split_whitespace();
        let Some(head) = parts.next() else {
            return Err(anyhow!("コマンドが指定されていません。"));
        };
        let command_name = head.to_ascii_lowercase();
        let args = Args::new(parts.collect());
        self.dispatch(command_name.as_str(), ctx, args)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register::<HelpCommand>();
        registry.register::<HelpAliasCommand>();
        registry.register::<PresetsCommand>();
        registry.register::<UseCommand>();
        registry.register::<StepCommand>();
        registry.register::<RunCommand>();
        registry.register::<StopCommand>();
        registry.register::<ResetCommand>();
        registry.register::<CountCommand>();
        registry.register::<SidesCommand>();
        registry.register::<LogXCommand>();
        registry.register::<LogYCommand>();
        registry.register::<ShowCommand>();
        registry.register::<StatsCommand>();
        registry.register::<InfoCommand>();
        registry.register::<DumpCommand>();
        registry.register::<QuitCommand>();
        registry.register::<ExitCommand>();
        registry
    }
}

fn parse_positive(token: &str, label: &str) -> Result<u32> {
    let value: u32 = token
        .parse()
        .map_err(|_| anyhow!("{label}は整数で指定してください: {token}"))?;
    ensure!(value > 0, "{label}は1以上を指定してください。");
    Ok(value)
}

pub struct HelpCommand;

impl Command for HelpCommand {
    fn name() -> &'static str {
        "help"
    }

    fn execute(_ctx: &mut Context<'_>, _args: Args<'_>) -> Result<()> {
        print_help();
        Ok(())
    }
}

pub struct HelpAliasCommand;

impl Command for HelpAliasCommand {
    fn name() -> &'static str {
        "?"
    }

    fn execute(ctx: &mut Context<'_>, args: Args<'_>) -> Result<()> {
        HelpCommand::execute(ctx, args)
    }
}

pub struct PresetsCommand;

impl Command for PresetsCommand {
    fn name() -> &'static str {
        "presets"
    }

    fn execute(ctx: &mut Context<'_>, _args: Args<'_>) -> Result<()> {
        print_presets(ctx.session());
        Ok(())
    }
}

pub struct UseCommand;

impl Command for UseCommand {
    fn name() -> &'static str {
        "use"
    }

    fn execute(ctx: &mut Context<'_>, mut args: Args<'_>) -> Result<()> {
        let name = args.next_required("プリセット名を指定してください。")?;
        ctx.session_mut().use_preset(name)?;
        println!(
            "{name} に切り替えました: {}",
            ctx.session().simulation()?.info_text()
        );
        Ok(())
    }
}

pub struct StepCommand;

impl Command for StepCommand {
    fn name() -> &'static str {
        "step"
    }

    fn execute(ctx: &mut Context<'_>, _args: Args<'_>) -> Result<()> {
        let simulation = ctx.session().simulation()?;
        simulation.step();
        println!("1フレーム進めました (合計 {} サンプル)", simulation.snapshot().total);
        Ok(())
    }
}

pub struct RunCommand;

impl Command for RunCommand {
    fn name() -> &'static str {
        "run"
    }

    fn execute(ctx: &mut Context<'_>, mut args: Args<'_>) -> Result<()> {
        let frames = match args.next() {
            Some(token) => parse_positive(token, "フレーム数")? as usize,
            None => DEFAULT_RUN_FRAMES,
        };
        let session = ctx.session();
        let simulation = session.simulation()?;
        if !simulation.is_running() {
            simulation.run();
        }
        session.advance_frames(frames);
        let snapshot = simulation.snapshot();
        println!(
            "{frames} フレーム進めました (合計 {} サンプル, {})",
            snapshot.total,
            if simulation.is_running() {
                "実行中"
            } else {
                "停止済み"
            }
        );
        Ok(())
    }
}

pub struct StopCommand;

impl Command for StopCommand {
    fn name() -> &'static str {
        "stop"
    }

    fn execute(ctx: &mut Context<'_>, _args: Args<'_>) -> Result<()> {
        ctx.session().simulation()?.stop();
        println!("実行を停止しました。");
        Ok(())
    }
}

pub struct ResetCommand;

impl Command for ResetCommand {
    fn name() -> &'static str {
        "reset"
    }

    fn execute(ctx: &mut Context<'_>, _args: Args<'_>) -> Result<()> {
        ctx.session().simulation()?.reset();
        println!("ヒストグラムをリセットしました。");
        Ok(())
    }
}

pub struct CountCommand;

impl Command for CountCommand {
    fn name() -> &'static str {
        "count"
    }

    fn execute(ctx: &mut Context<'_>, mut args: Args<'_>) -> Result<()> {
        let token = args.next_required("試行回数を指定してください。")?;
        let count = parse_positive(token, "試行回数")?;
        let simulation = ctx.session().simulation()?;
        simulation.set_count(count);
        println!("試行回数を {count} に設定しました: {}", simulation.info_text());
        Ok(())
    }
}

pub struct SidesCommand;

impl Command for SidesCommand {
    fn name() -> &'static str {
        "sides"
    }

    fn execute(ctx: &mut Context<'_>, mut args: Args<'_>) -> Result<()> {
        let token = args.next_required("面数 (または none) を指定してください。")?;
        let sides = if token.eq_ignore_ascii_case("none") {
            None
        } else {
            Some(parse_positive(token, "面数")?)
        };
        let simulation = ctx.session().simulation()?;
        simulation.set_sides(sides);
        println!("面数を設定しました: {}", simulation.info_text());
        Ok(())
    }
}

pub struct LogXCommand;

impl Command for LogXCommand {
    fn name() -> &'static str {
        "logx"
    }

    fn execute(ctx: &mut Context<'_>, _args: Args<'_>) -> Result<()> {
        let simulation = ctx.session().simulation()?;
        let next = !simulation.params().log_x;
        simulation.set_log_x(next);
        println!("x 軸の対数表示: {}", if next { "on" } else { "off" });
        Ok(())
    }
}

pub struct LogYCommand;

impl Command for LogYCommand {
    fn name() -> &'static str {
        "logy"
    }

    fn execute(ctx: &mut Context<'_>, _args: Args<'_>) -> Result<()> {
        let simulation = ctx.session().simulation()?;
        let next = !simulation.params().log_y;
        simulation.set_log_y(next);
        println!("y 軸の対数表示: {}", if next { "on" } else { "off" });
        Ok(())
    }
}

pub struct ShowCommand;

impl Command for ShowCommand {
    fn name() -> &'static str {
        "show"
    }

    fn execute(ctx: &mut Context<'_>, _args: Args<'_>) -> Result<()> {
        print_histogram(ctx.session())
    }
}

pub struct StatsCommand;

impl Command for StatsCommand {
    fn name() -> &'static str {
        "stats"
    }

    fn execute(ctx: &mut Context<'_>, _args: Args<'_>) -> Result<()> {
        print_stats(ctx.session())
    }
}

pub struct InfoCommand;

impl Command for InfoCommand {
    fn name() -> &'static str {
        "info"
    }

    fn execute(ctx: &mut Context<'_>, _args: Args<'_>) -> Result<()> {
        print_info(ctx.session())
    }
}

pub struct DumpCommand;

impl Command for DumpCommand {
    fn name() -> &'static str {
        "dump"
    }

    fn execute(ctx: &mut Context<'_>, _args: Args<'_>) -> Result<()> {
        let snapshot = ctx.session().simulation()?.snapshot();
        let json = serde_json::to_string_pretty(&snapshot)
            .context("スナップショットのJSON変換に失敗しました")?;
        println!("{json}");
        Ok(())
    }
}

pub struct QuitCommand;

impl Command for QuitCommand {
    fn name() -> &'static str {
        "quit"
    }

    fn execute(_ctx: &mut Context<'_>, _args: Args<'_>) -> Result<()> {
        println!("シミュレーションを終了します。");
        process::exit(0);
    }
}

pub struct ExitCommand;

impl Command for ExitCommand {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(ctx: &mut Context<'_>, args: Args<'_>) -> Result<()> {
        QuitCommand::execute(ctx, args)
    }
}
