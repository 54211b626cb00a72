use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use contracts::domain::a007_ad_metrics::aggregate::AdLevel;
use contracts::usecases::common::SyncResult;
use std::sync::Arc;
use sync_backend::domain::a002_product::product_type::ProductProfile;
use sync_backend::shared::ads_platform::{AdsPlatform, GraphApiClient};
use sync_backend::shared::config::{self, Config};
use sync_backend::shared::context::SyncContext;
use sync_backend::shared::data::db;
use sync_backend::shared::erp::{ErpSource, JsonRpcErpClient};
use sync_backend::system;
use sync_backend::usecases::{
    u501_sync_clients::ClientSyncExecutor, u502_sync_products::ProductSyncExecutor,
    u503_sync_sales::SalesSyncExecutor, u504_sync_materials::MaterialSyncExecutor,
    u505_sync_expiry_lots::ExpiryLotSyncExecutor, u506_sync_ad_accounts::AdAccountSyncExecutor,
    u507_sync_ad_metrics::{AdMetricsSyncExecutor, DateRangeCache},
    u508_ad_report::AdReportExecutor,
};

#[derive(Debug, Parser)]
#[command(name = "sync-backend")]
#[command(about = "ERP and ad-platform sync into the reporting warehouse")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Insert new clients
    Clients,
    /// Overwrite profiles of known clients
    ClientsUpdate,
    /// Insert new finished goods
    Products,
    /// Insert new supplies (raw materials, packaging)
    Supplies,
    /// Overwrite known products
    ProductsUpdate {
        #[arg(long)]
        supplies: bool,
    },
    /// Insert new invoices and credit notes and reclassify their clients
    Sales,
    /// Rebuild bills of materials
    Materials,
    /// Insert new expiry lots
    ExpiryLots,
    /// Update quantities of known expiry lots
    ExpiryLotsUpdate,
    /// Reconcile configured ad accounts
    AdAccounts,
    /// Sync daily ad metrics of one account and level
    AdMetrics {
        #[arg(long)]
        account: String,
        #[arg(long, value_parser = parse_level)]
        level: AdLevel,
    },
    /// Forget stored insight date ranges of one account, or of all accounts
    ClearDateCache {
        #[arg(long)]
        account: Option<String>,
    },
    /// Aggregate stored ad metrics for a period
    Report {
        #[arg(long)]
        account: String,
        #[arg(long, value_parser = parse_level)]
        level: AdLevel,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
}

fn parse_level(value: &str) -> Result<AdLevel, String> {
    AdLevel::parse(value).ok_or_else(|| format!("unknown level '{}'", value))
}

fn erp_source(config: &Config) -> anyhow::Result<Arc<dyn ErpSource>> {
    Ok(Arc::new(JsonRpcErpClient::new(config.erp.clone())?))
}

fn ads_platform(config: &Config) -> anyhow::Result<Arc<dyn AdsPlatform>> {
    Ok(Arc::new(GraphApiClient::new(&config.ads)?))
}

async fn run(command: Commands, ctx: SyncContext, config: &Config) -> anyhow::Result<SyncResult> {
    let result = match command {
        Commands::Clients => {
            ClientSyncExecutor::new(ctx, erp_source(config)?)
                .insert_clients()
                .await
        }
        Commands::ClientsUpdate => {
            ClientSyncExecutor::new(ctx, erp_source(config)?)
                .update_clients()
                .await
        }
        Commands::Products => {
            ProductSyncExecutor::new(ctx, erp_source(config)?)
                .insert_products(ProductProfile::FinishedGood)
                .await
        }
        Commands::Supplies => {
            ProductSyncExecutor::new(ctx, erp_source(config)?)
                .insert_products(ProductProfile::Supply)
                .await
        }
        Commands::ProductsUpdate { supplies } => {
            let profile = if supplies {
                ProductProfile::Supply
            } else {
                ProductProfile::FinishedGood
            };
            ProductSyncExecutor::new(ctx, erp_source(config)?)
                .update_products(profile)
                .await
        }
        Commands::Sales => SalesSyncExecutor::new(ctx, erp_source(config)?).sync_sales().await,
        Commands::Materials => {
            MaterialSyncExecutor::new(ctx, erp_source(config)?)
                .rebuild_materials()
                .await
        }
        Commands::ExpiryLots => {
            ExpiryLotSyncExecutor::new(ctx, erp_source(config)?)
                .insert_expiry_lots()
                .await
        }
        Commands::ExpiryLotsUpdate => {
            ExpiryLotSyncExecutor::new(ctx, erp_source(config)?)
                .update_expiry_lots()
                .await
        }
        Commands::AdAccounts => {
            AdAccountSyncExecutor::new(ctx, config.ads.accounts.clone())
                .sync_accounts()
                .await
        }
        Commands::AdMetrics { account, level } => {
            let cache = DateRangeCache::new(config.sync.date_cache_ttl_secs);
            AdMetricsSyncExecutor::new(ctx, ads_platform(config)?, config.ads.clone(), cache)
                .sync_metrics(&account, level)
                .await
        }
        Commands::ClearDateCache { account } => {
            let cache = DateRangeCache::new(config.sync.date_cache_ttl_secs);
            AdMetricsSyncExecutor::new(ctx, ads_platform(config)?, config.ads.clone(), cache)
                .clear_date_ranges(account.as_deref())
                .await
        }
        Commands::Report {
            account,
            level,
            from,
            to,
        } => AdReportExecutor::new(ctx).report(level, &account, from, to).await,
    };
    Ok(result)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    system::tracing::initialize()?;

    let config = config::load_config()?;
    let db_path = config::get_database_path(&config)?;
    let conn = db::connect(&db_path).await?;
    let ctx = SyncContext::new(conn, config.sync.clone());

    let result = run(cli.command, ctx, &config).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
