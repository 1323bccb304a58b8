// ==========================================
// 珠宝维修定价系统 - 命令行入口
// ==========================================
// 输出: 结果以 JSON 打印到 stdout，日志写 stderr
// ==========================================

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use repair_pricing::api::CatalogDocument;
use repair_pricing::app::{get_default_db_path, AppState, DB_PATH_ENV};
use repair_pricing::domain::AdminSettings;
use repair_pricing::{logging, APP_NAME, VERSION};

/// 珠宝维修定价命令行工具
#[derive(Parser, Debug)]
#[command(name = "repair-pricing")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "按金属变体计算维修任务的零售价与批发价")]
struct Cli {
    /// SQLite 数据库路径
    #[arg(long, env = DB_PATH_ENV)]
    db: Option<String>,

    /// 操作人（写入操作日志）
    #[arg(long, default_value = "cli")]
    actor: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 初始化数据库表结构
    InitDb,

    /// 导入工序/材料目录（JSON: {processes, materials}）
    ImportCatalog { file: PathBuf },

    /// 管理设置
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },

    /// 创建维修任务（JSON: {title, category, processes, materials}）
    CreateTask { file: PathBuf },

    /// 更新维修任务定义并重新定价
    UpdateTask { task_id: String, file: PathBuf },

    /// 查看任务及其定价状态
    ShowTask { task_id: String },

    /// 列出启用中的任务
    ListTasks,

    /// 不落库预览定价
    Preview { file: PathBuf },

    /// 查询任务在指定金属变体下的价格
    Quote {
        task_id: String,
        metal_type: String,
        karat: String,
    },

    /// 重算单个任务
    RecalcTask { task_id: String },

    /// 批量重算全部任务
    RecalcAll,

    /// 列出定价已过期的任务
    Stale,

    /// 材料在指定变体下的每份单价
    UnitPrice {
        material_id: String,
        #[arg(long, requires = "karat")]
        metal_type: Option<String>,
        #[arg(long, requires = "metal_type")]
        karat: Option<String>,
    },

    /// 任务的操作历史
    History { task_id: String },

    /// 最近一次批量重算记录
    LastRecalc,

    /// 最近的操作日志
    Actions {
        #[arg(long, default_value_t = 20)]
        limit: i32,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    /// 打印当前管理设置
    Show,
    /// 从 JSON 文件保存管理设置
    Set { file: PathBuf },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskView<'a> {
    task: &'a repair_pricing::RepairTask,
    pricing_state: repair_pricing::PricingState,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init();

    tracing::info!("{} v{}", APP_NAME, VERSION);

    let db_path = cli.db.clone().unwrap_or_else(get_default_db_path);
    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;
    tracing::info!(db_path = %state.db_path, "数据库已就绪");

    run(&state, &cli)
}

fn run(state: &AppState, cli: &Cli) -> Result<()> {
    let actor = cli.actor.as_str();

    match &cli.command {
        Commands::InitDb => print_json(&serde_json::json!({ "dbPath": state.db_path })),
        Commands::ImportCatalog { file } => {
            let doc: CatalogDocument = serde_json::from_value(read_json(file)?)
                .context("目录文件格式错误")?;
            print_json(&state.catalog_api.import(&doc)?)
        }
        Commands::Settings { action } => match action {
            SettingsCommand::Show => print_json(&state.pricing_api.get_admin_settings()?),
            SettingsCommand::Set { file } => {
                let settings: AdminSettings = serde_json::from_value(read_json(file)?)
                    .context("管理设置文件格式错误")?;
                state.pricing_api.update_admin_settings(&settings, actor)?;
                print_json(&settings)
            }
        },
        Commands::CreateTask { file } => {
            let input = state.task_api.parse_input(&read_json(file)?)?;
            print_json(&state.task_api.create_task(input, actor)?)
        }
        Commands::UpdateTask { task_id, file } => {
            let input = state.task_api.parse_input(&read_json(file)?)?;
            print_json(&state.task_api.update_task(task_id, input, actor)?)
        }
        Commands::ShowTask { task_id } => {
            let task = state.task_api.get_task(task_id)?;
            let pricing_state = state.task_api.pricing_state(task_id)?;
            print_json(&TaskView {
                task: &task,
                pricing_state,
            })
        }
        Commands::ListTasks => print_json(&state.task_api.list_tasks()?),
        Commands::Preview { file } => {
            let input = state.task_api.parse_input(&read_json(file)?)?;
            print_json(&state.task_api.preview_pricing(&input.selections)?)
        }
        Commands::Quote {
            task_id,
            metal_type,
            karat,
        } => print_json(&state.task_api.quote_repair(task_id, metal_type, karat)?),
        Commands::RecalcTask { task_id } => {
            print_json(&state.pricing_api.recalc_task(task_id, actor)?)
        }
        Commands::RecalcAll => print_json(&state.pricing_api.recalc_all(actor)?),
        Commands::Stale => print_json(&state.task_api.list_stale_tasks()?),
        Commands::UnitPrice {
            material_id,
            metal_type,
            karat,
        } => {
            let metal = match (metal_type, karat) {
                (Some(m), Some(k)) => Some((m.as_str(), k.as_str())),
                _ => None,
            };
            print_json(&state.pricing_api.material_unit_price(material_id, metal)?)
        }
        Commands::History { task_id } => print_json(&state.pricing_api.task_history(task_id)?),
        Commands::LastRecalc => print_json(&state.pricing_api.last_recalc_all()?),
        Commands::Actions { limit } => print_json(&state.pricing_api.recent_actions(*limit)?),
    }
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("无法读取文件: {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("JSON 解析失败: {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
