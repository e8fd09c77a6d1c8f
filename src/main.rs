use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use chatwatch::config::config::AppConfig;
use chatwatch::config::loader::{ConfigLoader, default_config_path};
use chatwatch::models::role::Role;
use chatwatch::observability::init_logging;
use chatwatch::services::role_registry::{
    DescriptorUpdate, RoleRegistry, delete_descriptor, update_descriptor, write_descriptor,
};
use chatwatch::services::{ChatMonitor, create_reply_generator};
use chatwatch::surface::{ConsoleReplySink, JsonLinesSnapshotSource};

#[derive(Parser)]
#[command(name = "chatwatch")]
#[command(about = "Chatwatch - 监控群聊 OCR 快照并以不同角色回复 @ 提问", long_about = None)]
struct Cli {
    /// 配置文件路径
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行监控循环
    Run {
        /// 快照来源：每行一个 JSON 数组的文件，`-` 表示标准输入
        #[arg(long, default_value = "-")]
        snapshots: PathBuf,
    },
    /// 管理角色描述文件
    Roles {
        #[command(subcommand)]
        action: RolesAction,
    },
}

#[derive(Subcommand)]
enum RolesAction {
    /// 列出已加载的角色
    List,
    /// 添加新角色
    Add {
        /// 角色名称，例如 `@翻译bot`
        #[arg(long)]
        name: String,
        /// 触发别名，可重复
        #[arg(long = "alias")]
        aliases: Vec<String>,
        /// 系统提示词文件
        #[arg(long)]
        prompt_file: PathBuf,
        /// 覆盖已存在的描述文件
        #[arg(long)]
        force: bool,
    },
    /// 修改已有角色，未给出的字段保持不变
    Edit {
        /// 要修改的角色名称
        #[arg(long)]
        name: String,
        /// 新的角色名称
        #[arg(long)]
        rename: Option<String>,
        /// 替换全部触发别名，可重复
        #[arg(long = "alias")]
        aliases: Vec<String>,
        /// 清空全部触发别名
        #[arg(long, conflicts_with = "aliases")]
        clear_aliases: bool,
        /// 新的系统提示词文件
        #[arg(long)]
        prompt_file: Option<PathBuf>,
    },
    /// 删除角色描述文件
    Delete {
        /// 要删除的角色名称
        #[arg(long)]
        name: String,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    let path = path.cloned().unwrap_or_else(default_config_path);
    let config = ConfigLoader::load_from(&path)
        .with_context(|| format!("无法加载配置 {}", path.display()))?;
    ConfigLoader::validate(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Run { snapshots } => run(config, snapshots).await,
        Commands::Roles { action } => match action {
            RolesAction::List => list_roles(&config),
            RolesAction::Add {
                name,
                aliases,
                prompt_file,
                force,
            } => add_role(&config, name, aliases, prompt_file, force),
            RolesAction::Edit {
                name,
                rename,
                aliases,
                clear_aliases,
                prompt_file,
            } => {
                let aliases = if clear_aliases {
                    Some(Vec::new())
                } else if aliases.is_empty() {
                    None
                } else {
                    Some(aliases)
                };
                edit_role(&config, name, rename, aliases, prompt_file)
            }
            RolesAction::Delete { name } => {
                let path = delete_descriptor(&config.roles.dir, &name)?;
                println!("已删除角色 {} ({})", name, path.display());
                Ok(())
            }
        },
    }
}

async fn run(config: AppConfig, snapshots: PathBuf) -> Result<()> {
    let _guard = init_logging(&config.logging)?;
    info!("正在初始化群聊监控...");

    let generator = create_reply_generator(&config.llm)?;
    let mut monitor = ChatMonitor::from_config(&config, generator, Box::new(ConsoleReplySink::new()));
    if monitor.registry().is_empty() {
        tracing::warn!("角色目录 {} 中没有可用角色，不会响应任何触发词", config.roles.dir.display());
    }

    let mut source = JsonLinesSnapshotSource::open(&snapshots).await?;
    monitor.run(&mut source).await?;
    Ok(())
}

fn list_roles(config: &AppConfig) -> Result<()> {
    let registry = RoleRegistry::load_from_dir(&config.roles.dir, &config.roles.default_prompt);
    if registry.is_empty() {
        println!("{} 中没有角色", config.roles.dir.display());
        return Ok(());
    }

    println!("可用角色 ({}):", registry.len());
    for role in registry.all_roles() {
        if role.aliases.is_empty() {
            println!("- {}", role.name);
        } else {
            println!("- {} (别名: {})", role.name, role.aliases.join(", "));
        }
    }
    Ok(())
}

fn read_prompt(prompt_file: &PathBuf) -> Result<String> {
    let prompt = std::fs::read_to_string(prompt_file)
        .with_context(|| format!("无法读取提示词文件 {}", prompt_file.display()))?;
    Ok(prompt.trim().to_string())
}

fn add_role(
    config: &AppConfig,
    name: String,
    aliases: Vec<String>,
    prompt_file: PathBuf,
    force: bool,
) -> Result<()> {
    let role = Role {
        name,
        aliases,
        system_prompt: read_prompt(&prompt_file)?,
    };
    let path = write_descriptor(&config.roles.dir, &role, force)?;
    println!("已添加角色 {} -> {}", role.name, path.display());
    Ok(())
}

fn edit_role(
    config: &AppConfig,
    name: String,
    rename: Option<String>,
    aliases: Option<Vec<String>>,
    prompt_file: Option<PathBuf>,
) -> Result<()> {
    let system_prompt = prompt_file.as_ref().map(read_prompt).transpose()?;
    let update = DescriptorUpdate {
        name: rename,
        aliases,
        system_prompt,
    };
    let (path, role) = update_descriptor(&config.roles.dir, &name, update)?;
    println!("已更新角色 {} -> {}", role.name, path.display());
    Ok(())
}
