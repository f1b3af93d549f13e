use accelerated_training::orchestra::{LogObserver, Orchestrator, RunConfig};
use accelerator::LocalClusterResolver;
use datasets::MnistIdxProvider;
use env_logger::Env;
use log::info;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = RunConfig::default();
    info!("reading {} from {}", config.dataset, config.data_dir.display());

    let resolver = LocalClusterResolver::new(config.replicas);
    let provider = MnistIdxProvider::new(&config.data_dir);

    let mut orchestrator = Orchestrator::new(config, LogObserver);
    let report = orchestrator.run(&resolver, &provider)?;

    if let Some((loss, accuracy)) = report.evaluation {
        println!("test loss: {loss:.4}, test accuracy: {accuracy:.4}");
    }

    Ok(())
}
