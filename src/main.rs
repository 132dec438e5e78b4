//! Native entry point: opens a dataset against the configured server and
//! prints what the session loaded.
//!
//! Usage: `boxmark-native [DATASET_ID]`. Without an argument the
//! `default_dataset` from the config file is used.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use boxmark::AppConfig;

    let config = AppConfig::load_or_default();
    env_logger::Builder::new()
        .filter_level(config.preferences.log_level.to_level_filter())
        .parse_default_env()
        .init();

    let dataset_id = match std::env::args().nth(1) {
        Some(arg) => match arg.parse::<u64>() {
            Ok(id) => Some(id),
            Err(_) => {
                eprintln!("Invalid dataset id: {}", arg);
                std::process::exit(2);
            }
        },
        None => config.preferences.default_dataset,
    };
    let Some(dataset_id) = dataset_id else {
        eprintln!("Usage: boxmark-native <DATASET_ID>");
        std::process::exit(2);
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };
    let local = tokio::task::LocalSet::new();
    if let Err(e) = local.block_on(&runtime, native::run(config, dataset_id)) {
        eprintln!("Application error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use boxmark::constants::DEFAULT_CONTAINER_SIZE;
    use boxmark::{ApiError, AppConfig, HttpApi, Workspace, WorkspaceStatus};
    use boxmark_canvas::Callback;

    pub async fn run(config: AppConfig, dataset_id: u64) -> Result<(), ApiError> {
        let api = HttpApi::new(
            &config.preferences.server_url,
            config.preferences.api_token.clone(),
        )?;
        log::info!("Server: {}", api.base_url());

        let mut workspace = Workspace::new(api, &config);
        workspace.set_progress_callback(Callback::new(|progress| {
            log::info!("Loading images: {}%", progress)
        }));
        workspace.set_container_size(DEFAULT_CONTAINER_SIZE.0, DEFAULT_CONTAINER_SIZE.1);
        workspace.open(dataset_id).await;

        for notification in workspace.notifications_mut().drain() {
            println!("[{:?}] {}", notification.level, notification.message);
        }

        println!("Dataset {}", dataset_id);
        for category in workspace.categories() {
            match category.shortcut_key {
                Some(key) => println!("  {} ({}) [{}]", category.name, category.id, key),
                None => println!("  {} ({})", category.name, category.id),
            }
        }

        match workspace.status() {
            WorkspaceStatus::Completed => println!("Nothing left to annotate"),
            _ => {
                if let Some(image) = workspace.current_image() {
                    println!(
                        "Current image: {} ({}), {} annotations, {} queued",
                        image.record.filename,
                        image.id(),
                        workspace.store().len(),
                        workspace.navigator().queue_len()
                    );
                    println!(
                        "Scale {:.3}, {} draw commands",
                        workspace.scale(),
                        workspace.render().commands().len()
                    );
                }
            }
        }
        Ok(())
    }
}

// WASM doesn't use main(), it uses wasm_bindgen's start function
#[cfg(target_arch = "wasm32")]
fn main() {}
