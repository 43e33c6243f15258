use std::path::PathBuf;

use clap::Parser;
use rucheck::runner::StageReporter;
use rucheck::variable::{ConfigLoader, FlagsDecl, OptionsDecl};
use rucheck::{DEFAULT_USER_AGENT, ResultCode, Result, SequenceRunner, StageOptions, StatusLine};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// 单次检查的目标 URL
    #[arg(short = 'u', long)]
    pub url: Option<String>,

    /// 多阶段检查的 runfile（YAML 或 TOML）
    #[arg(short = 'f', long)]
    pub runfile: Option<PathBuf>,

    #[arg(long, default_value = "code:200", help = "[code:HTTPCODE|pattern:REGEX]")]
    pub test: String,

    #[arg(long = "connect-timeout", default_value_t = 5.0)]
    pub connect_timeout: f64,

    #[arg(long, default_value_t = 10.0)]
    pub timeout: f64,

    #[arg(long, value_name = "var1:value1,var2:value2")]
    pub postdata: Option<String>,

    #[arg(long)]
    pub proxy: Option<String>,

    /// Follow redirects
    #[arg(long)]
    pub location: bool,

    /// turn on debug
    #[arg(long)]
    pub debug: bool,

    #[arg(long)]
    pub insecure: bool,

    #[arg(long = "useragent", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// 传输指令，JSON 对象，如 '{"resolve": "example.com:443:127.0.0.1"}'
    #[arg(long)]
    pub flags: Option<String>,
}

impl Cli {
    /// 把单次检查的命令行参数转换为阶段声明
    fn to_options_decl(&self) -> Result<OptionsDecl> {
        let flags = match self.flags.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(json) => Some(serde_json::from_str::<FlagsDecl>(json)?),
        };

        Ok(OptionsDecl {
            url: self.url.clone(),
            test: Some(self.test.clone()),
            connecttimeout: Some(self.connect_timeout),
            timeout: Some(self.timeout),
            location: Some(self.location),
            insecure: Some(self.insecure),
            proxy: self.proxy.clone(),
            postdata: self
                .postdata
                .as_ref()
                .map(|p| p.split(',').map(|s| s.to_string()).collect()),
            user_agent: Some(self.user_agent.clone()),
            flags,
            referer: None,
            failaterror: Some(true),
            debug: Some(self.debug),
        })
    }
}

/// 执行检查并返回（退出码，状态行）
async fn execute(cli: &Cli) -> Result<(i32, String)> {
    let runner = SequenceRunner::new();

    if cli.url.is_some() {
        let stage = StageOptions::try_from(cli.to_options_decl()?)?;
        let result = runner.run_single(&stage).await;
        return Ok((result.code.as_i32(), StatusLine::single(&result)));
    }

    if let Some(ref runfile) = cli.runfile {
        let plan = ConfigLoader::load_plan(runfile, cli.debug)?;
        let result = runner.run(&plan.stages, plan.cookie_jar).await?;
        if cli.debug {
            StageReporter::new().print_sequence(&result);
        }
        return Ok((result.code().as_i32(), StatusLine::sequence(&result)));
    }

    Ok((
        ResultCode::Unknown.as_i32(),
        StatusLine::unknown("No URL / runfile supplied"),
    ))
}

/// 打印状态行并返回进程退出码
pub async fn run(cli: Cli) -> i32 {
    let (code, line) = match execute(&cli).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("{}", e);
            (ResultCode::Unknown.as_i32(), StatusLine::unknown(&e.to_string()))
        }
    };
    println!("{}", line);
    code
}
