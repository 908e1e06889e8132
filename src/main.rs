use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::prelude::*;

use qingpush::config::Config;
use qingpush::http::{HttpClient, ReqwestHttpClient};
use qingpush::{Article, ChannelRegistry, MessageType, PushMessage, TokenCache};

#[derive(Parser)]
#[command(name = "qingpush", about = "多渠道消息推送", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 发送一条消息
    Send(SendArgs),
    /// 列出已注册的渠道
    Channels,
    /// 初始化配置文件
    Init,
    /// 显示当前配置
    Config,
}

#[derive(clap::Args)]
struct SendArgs {
    /// 渠道标识（wecom / feishu / dingtalk ...）
    #[arg(short, long)]
    channel: Option<String>,

    /// 使用的凭证档案（[channels.<profile>]）
    #[arg(short, long)]
    profile: Option<String>,

    /// 接收者
    #[arg(short, long)]
    target: Option<String>,

    /// 消息类型：text / markdown / text_card / image / news
    #[arg(long = "type", default_value = "text")]
    msg_type: MessageType,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    content: Option<String>,

    /// 文本卡片跳转链接；图文消息时作为单条图文的链接
    #[arg(long)]
    url: Option<String>,

    /// 图片消息的 media_id
    #[arg(long)]
    media_id: Option<String>,

    /// 从 JSON 文件读取完整消息，忽略上面的消息参数
    #[arg(long, conflicts_with_all = ["title", "content", "url", "media_id"])]
    message_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing()?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Send(args) => run_send(args).await?,
        Commands::Channels => run_channels()?,
        Commands::Init => run_init()?,
        Commands::Config => run_config()?,
    }

    Ok(())
}

fn build_registry(config: &Config) -> ChannelRegistry {
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new(config.http.timeout()));
    let cache = Arc::new(TokenCache::with_safety_margin(config.cache.safety_margin_secs));
    ChannelRegistry::with_builtin(http, cache)
}

fn build_message(args: &SendArgs) -> Result<PushMessage> {
    if let Some(path) = &args.message_file {
        let raw = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("读取消息文件失败: {}", path.display()))?;
        let mut message: PushMessage =
            serde_json::from_str(&raw).wrap_err("消息文件不是合法的 JSON")?;
        // 命令行的 --target 覆盖消息文件里的 target
        if let Some(target) = &args.target {
            message = message.with_target(target);
        }
        return Ok(message);
    }

    if args.msg_type == MessageType::News {
        let url = args
            .url
            .as_deref()
            .ok_or_else(|| eyre!("图文消息需要 --url"))?;
        let mut article = Article::new(args.title.clone().unwrap_or_default(), url);
        if let Some(content) = &args.content {
            article = article.with_description(content);
        }
        let message = PushMessage::news(args.target.clone().unwrap_or_default(), vec![article])
            .wrap_err("图文消息不合法")?;
        return Ok(message);
    }

    let mut builder = PushMessage::builder().msg_type(args.msg_type);
    if let Some(target) = &args.target {
        builder = builder.target(target);
    }
    if let Some(title) = &args.title {
        builder = builder.title(title);
    }
    if let Some(content) = &args.content {
        builder = builder.content(content);
    }
    if let Some(media_id) = &args.media_id {
        builder = builder.extra("media_id", media_id.as_str());
    }
    if let Some(url) = &args.url {
        builder = builder.extra("url", url.as_str());
    }
    Ok(builder.build())
}

async fn run_send(args: SendArgs) -> Result<()> {
    let config = Config::load_or_init().wrap_err("加载配置失败")?;
    let (channel, push_config) =
        config.resolve(args.channel.as_deref(), args.profile.as_deref())?;
    let message = build_message(&args)?;

    let registry = build_registry(&config);
    let result = qingpush::dispatch(&registry, &channel, &message, &push_config)
        .await
        .wrap_err_with(|| format!("无法发送到渠道 {}", channel))?;

    println!(
        "{}",
        serde_json::to_string_pretty(&result).wrap_err("序列化结果失败")?
    );

    if !result.success {
        return Err(eyre!(
            "发送失败: {}",
            result.error_msg.as_deref().unwrap_or("unknown error")
        ));
    }
    Ok(())
}

fn run_channels() -> Result<()> {
    let config = Config::load_or_init().wrap_err("加载配置失败")?;
    let registry = build_registry(&config);

    if registry.is_empty() {
        println!("没有已注册的渠道。");
        return Ok(());
    }

    for channel_type in registry.channel_types() {
        let channel = registry.get(&channel_type)?;
        println!(
            "{:<12} weight={:<4} {}",
            channel_type,
            channel.weight(),
            channel.impl_name()
        );
    }
    Ok(())
}

fn run_init() -> Result<()> {
    let config_path = Config::config_path()?;

    if Config::init_at(&config_path)? {
        println!("已创建配置文件: {}", config_path.display());
        println!("请编辑该文件添加渠道凭证。");
    } else {
        println!("配置文件已存在: {}", config_path.display());
        println!("如需重新初始化，请先删除该文件。");
    }

    Ok(())
}

fn run_config() -> Result<()> {
    let config_path = Config::config_path()?;

    if !config_path.exists() {
        println!("配置文件不存在。运行 `qingpush init` 创建。");
        return Ok(());
    }

    let content = std::fs::read_to_string(&config_path).wrap_err("读取配置文件失败")?;
    println!("配置文件: {}\n", config_path.display());
    println!("{}", content);

    Ok(())
}

/// 初始化 tracing: stderr 只输出 warn+，日志文件输出 debug+
fn init_tracing() -> Result<()> {
    let log_dir = Config::log_dir()?;
    std::fs::create_dir_all(&log_dir)
        .wrap_err_with(|| format!("创建日志目录失败: {}", log_dir.display()))?;

    // 文件日志: 按天滚动，debug 级别
    let file_appender = tracing_appender::rolling::daily(&log_dir, "qingpush.log");
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("qingpush=debug")),
        );

    // stderr: 只输出 warn+（不污染 stdout 上的 JSON 结果）
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send_args(argv: &[&str]) -> SendArgs {
        let mut full = vec!["qingpush", "send"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Send(args) => args,
            _ => panic!("expected send"),
        }
    }

    #[test]
    fn news_without_title_is_rejected() {
        let args = send_args(&["--channel", "wecom", "--type", "news", "--url", "https://x"]);
        let err = build_message(&args).unwrap_err();
        assert!(format!("{:#}", err).contains("Article title cannot be null"));
    }

    #[test]
    fn news_from_flags() {
        let args = send_args(&[
            "--target", "u1", "--type", "news", "--title", "周报", "--url", "https://x", "--content",
            "摘要",
        ]);
        let message = build_message(&args).unwrap();
        assert_eq!(message.msg_type(), Some(MessageType::News));
        assert_eq!(message.articles()[0].title, "周报");
        assert_eq!(message.articles()[0].description.as_deref(), Some("摘要"));
    }

    #[test]
    fn text_card_from_flags() {
        let args = send_args(&[
            "--target", "u1", "--type", "text_card", "--title", "t", "--content", "c", "--url",
            "https://x",
        ]);
        let message = build_message(&args).unwrap();
        assert_eq!(message.msg_type(), Some(MessageType::TextCard));
        assert_eq!(message.extra_str("url").as_deref(), Some("https://x"));
    }

    #[test]
    fn message_file_null_type_survives_target_override() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("msg.json");
        std::fs::write(&path, r#"{"target":"a","type":null,"content":"x"}"#).unwrap();

        let args = send_args(&["--target", "b", "--message-file", path.to_str().unwrap()]);
        let message = build_message(&args).unwrap();
        assert_eq!(message.target(), Some("b"));
        assert!(message.msg_type().is_none());
    }
}
