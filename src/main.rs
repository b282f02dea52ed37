use clap::Parser;
use std::process;

use ip2loc::cli::{Cli, Commands, parse_addr};
use ip2loc::config::{get_config, init_config, update_config};
use ip2loc::errors::Ip2LocError;
use ip2loc::runtime::modes;
use ip2loc::system::logging::init_logging;

#[actix_web::main]
async fn main() {
    let cli = Cli::parse();

    // 子命令 config 在加载配置之前处理，避免缺失配置文件时报错
    if cli.command == Some(Commands::Config) {
        modes::run_config();
        return;
    }

    if let Err(e) = apply_config(&cli) {
        exit_with(e.into());
    }
    let config = get_config();

    let _guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => exit_with(e.into()),
    };

    let result = match cli.command {
        Some(Commands::Lookup { ip, lang, raw }) => {
            modes::run_lookup(&config, &ip, &lang, raw).await
        }
        Some(Commands::Serve) | Some(Commands::Config) | None => modes::run_server(config).await,
    };

    if let Err(e) = result {
        exit_with(e);
    }
}

/// 加载配置并覆盖命令行参数
fn apply_config(cli: &Cli) -> ip2loc::errors::Result<()> {
    let loaded = init_config(cli.config.as_deref())?;
    if cli.addr.is_none() && cli.mmdb.is_none() {
        return Ok(());
    }

    let mut config = (*loaded).clone();
    if let Some(addr) = &cli.addr {
        let (host, port) = parse_addr(addr).ok_or_else(|| {
            Ip2LocError::config(format!("--addr expects HOST:PORT, got {}", addr))
        })?;
        config.server.host = host;
        config.server.port = port;
    }
    if let Some(mmdb) = &cli.mmdb {
        config.database.path = mmdb.clone();
    }
    update_config(config)
}

fn exit_with(err: anyhow::Error) -> ! {
    match err.downcast_ref::<Ip2LocError>() {
        Some(e) => {
            if err.chain().count() > 1 {
                eprintln!("{}", err);
            }
            eprintln!("{}", e.format_colored());
        }
        None => eprintln!("{:#}", err),
    }
    process::exit(1);
}
