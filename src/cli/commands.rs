use anyhow::{bail, Context, Result};
use blog_site::auth::{IdentityProvider, TokenIdentityProvider};
use blog_site::core::{AppState, BlogService, Server};
use blog_site::models::config::StoreKind;
use blog_site::models::{BlogPost, Config, Identity, NewPost, Notice, NoticeLevel};
use blog_site::store;
use blog_site::theme::ThemeRenderer;
use blog_site::utils::{display_date, front_matter, truncate_chars};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// 配置文件路径
    #[arg(short, long, default_value = "_config.yml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 生成默认配置文件
    Init(InitArgs),

    /// 启动网站服务器
    Serve(ServeArgs),

    /// 创建新的文章
    New(NewArgs),

    /// 从目录导入 Markdown 文章
    Import(ImportArgs),

    /// 列出文章
    List(ListArgs),

    /// 切换文章的发布状态
    Toggle(IdArgs),

    /// 删除文章
    Delete(IdArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// 站点标题
    #[arg(short, long)]
    pub title: Option<String>,

    /// 覆盖已有的配置文件
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ServeArgs {
    /// 服务器端口
    #[arg(short, long)]
    pub port: Option<u16>,

    /// 监听地址
    #[arg(long)]
    pub host: Option<String>,
}

#[derive(Args)]
pub struct TokenArgs {
    /// 访问令牌（由认证服务签发）
    #[arg(long, env = "BLOG_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Args)]
pub struct NewArgs {
    /// 文章标题
    pub title: String,

    /// 文章分类
    #[arg(short = 'c', long)]
    pub category: String,

    /// 从文件读取正文
    #[arg(short = 'f', long, conflicts_with = "content")]
    pub content_file: Option<PathBuf>,

    /// 正文内容
    #[arg(long)]
    pub content: Option<String>,

    /// 摘要（默认使用标题）
    #[arg(short, long)]
    pub excerpt: Option<String>,

    /// 封面图片地址
    #[arg(long)]
    pub cover: Option<String>,

    /// 保存为草稿而不是发布
    #[arg(short, long)]
    pub draft: bool,

    #[command(flatten)]
    pub auth: TokenArgs,
}

#[derive(Args)]
pub struct ImportArgs {
    /// 文章目录
    pub dir: PathBuf,

    #[command(flatten)]
    pub auth: TokenArgs,
}

#[derive(Args)]
pub struct ListArgs {
    /// 包含草稿（需要登录）
    #[arg(short, long)]
    pub all: bool,

    #[command(flatten)]
    pub auth: TokenArgs,
}

#[derive(Args)]
pub struct IdArgs {
    /// 文章 ID
    pub id: Uuid,

    #[command(flatten)]
    pub auth: TokenArgs,
}

fn print_notice(notice: &Notice) {
    match notice.level {
        NoticeLevel::Success => println!("{} {}", "✔".bright_green(), notice.message),
        NoticeLevel::Error => println!("{} {}", "✘".bright_red(), notice.message),
    }
}

fn print_post(post: &BlogPost) {
    let status = if post.published {
        post.status_label().bright_green()
    } else {
        post.status_label().yellow()
    };
    println!(
        "{}  {:<9}  {}  {}  [{}]  {}",
        post.id.to_string().bright_black(),
        status,
        display_date(&post.created_at),
        truncate_chars(&post.title, 48).bright_white(),
        post.category,
        post.read_time
    );
}

/// 把服务错误转换为命令行错误，同时打印给用户的提示
fn report<T>(result: blog_site::BlogResult<T>) -> Result<T> {
    result.map_err(|e| {
        print_notice(&e.notice());
        anyhow::Error::new(e)
    })
}

/// 命令执行所需的配置与服务
struct Session {
    config: Config,
    service: BlogService,
    identities: Arc<dyn IdentityProvider>,
}

impl Session {
    fn load(config_path: &Path) -> Result<Self> {
        let config = Config::load(config_path)
            .with_context(|| format!("加载配置失败: {}", config_path.display()))?;
        if config.store.kind == StoreKind::Memory {
            warn!("使用内存存储，进程退出后数据不会保留");
        }
        let store = store::open(&config.store)?;
        let identities: Arc<dyn IdentityProvider> =
            Arc::new(TokenIdentityProvider::from_config(&config.auth));
        let service = BlogService::new(store, config.clone());
        Ok(Self {
            config,
            service,
            identities,
        })
    }

    fn identity(&self, auth: &TokenArgs) -> Identity {
        self.identities.resolve(auth.token.as_deref())
    }
}

/// 执行命令
pub async fn execute(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_path();
    match cli.command {
        Commands::Init(args) => init(config_path, &args),
        Commands::Serve(args) => serve(Session::load(config_path)?, args).await,
        Commands::New(args) => new_post(&Session::load(config_path)?, args),
        Commands::Import(args) => import(&Session::load(config_path)?, args),
        Commands::List(args) => list(&Session::load(config_path)?, args),
        Commands::Toggle(args) => toggle(&Session::load(config_path)?, args),
        Commands::Delete(args) => delete(&Session::load(config_path)?, args),
    }
}

async fn serve(ctx: Session, args: ServeArgs) -> Result<()> {
    let host = args.host.unwrap_or_else(|| ctx.config.server.host.clone());
    let port = args.port.unwrap_or(ctx.config.server.port);
    let renderer = ThemeRenderer::new(ctx.config.clone())?;
    let state = AppState::new(ctx.service, renderer, ctx.identities);
    Server::new(state, host, port).start().await
}

fn new_post(ctx: &Session, args: NewArgs) -> Result<()> {
    let identity = ctx.identity(&args.auth);
    let content = match (args.content_file, args.content) {
        (Some(path), _) => fs::read_to_string(&path)
            .with_context(|| format!("读取文件失败: {}", path.display()))?,
        (None, Some(content)) => content,
        (None, None) => String::new(),
    };
    let post = NewPost {
        title: args.title,
        excerpt: args.excerpt.unwrap_or_default(),
        content,
        category: args.category,
        cover_image: args.cover.unwrap_or_default(),
        published: !args.draft,
    };
    let (created, notice) = if args.draft {
        report(ctx.service.save_draft(&identity, post))?
    } else {
        report(ctx.service.publish(&identity, post))?
    };
    print_notice(&notice);
    print_post(&created);
    Ok(())
}

fn import(ctx: &Session, args: ImportArgs) -> Result<()> {
    let identity = ctx.identity(&args.auth);
    let posts = front_matter::collect_posts(&args.dir)?;
    if posts.is_empty() {
        bail!("目录中没有 Markdown 文件: {}", args.dir.display());
    }
    let mut imported = 0;
    for (path, post) in posts {
        let result = if post.published {
            ctx.service.publish(&identity, post)
        } else {
            ctx.service.save_draft(&identity, post)
        };
        match result {
            Ok((created, _)) => {
                imported += 1;
                print_post(&created);
            }
            Err(e) => {
                warn!("跳过 {}: {}", path.display(), e);
                print_notice(&e.notice());
            }
        }
    }
    info!("导入完成: {} 篇文章", imported);
    Ok(())
}

fn list(ctx: &Session, args: ListArgs) -> Result<()> {
    let posts = if args.all {
        let identity = ctx.identity(&args.auth);
        report(ctx.service.admin_posts(&identity))?
    } else {
        report(ctx.service.latest_published())?
    };
    if posts.is_empty() {
        println!("No posts yet.");
    }
    for post in &posts {
        print_post(post);
    }
    Ok(())
}

fn toggle(ctx: &Session, args: IdArgs) -> Result<()> {
    let identity = ctx.identity(&args.auth);
    let (post, notice) = report(ctx.service.toggle_publish(&identity, args.id))?;
    print_notice(&notice);
    print_post(&post);
    Ok(())
}

fn delete(ctx: &Session, args: IdArgs) -> Result<()> {
    let identity = ctx.identity(&args.auth);
    let notice = report(ctx.service.delete(&identity, args.id))?;
    print_notice(&notice);
    Ok(())
}

fn init(config_path: &Path, args: &InitArgs) -> Result<()> {
    if config_path.exists() && !args.force {
        bail!(
            "配置文件已存在: {} (使用 --force 覆盖)",
            config_path.display()
        );
    }
    let mut config = Config::default();
    if let Some(title) = &args.title {
        config.title = title.clone();
    }
    config.store.kind = StoreKind::File;
    config.store.path = Some(PathBuf::from("blog_posts.json"));
    config.save(config_path)?;
    info!("Initialized new site config at: {}", config_path.display());
    Ok(())
}
