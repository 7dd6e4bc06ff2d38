use crate::{
    cli::args::{DeployArgs, GenerateArgs, ScanArgs},
    core::{
        config::FsbConfig,
        deploy::{ArmClient, AzureBlobUploader, FunctionUploader},
        deploy_all,
        types::OutputFormat,
        Converter, Loader,
    },
    LoadedFlow, Result,
};
use anyhow::{anyhow, Context};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub async fn scan(args: ScanArgs, config: &FsbConfig, cancel: &CancellationToken) -> Result<()> {
    let loader = Loader::from_config(config)?;
    let flows = loader.load(&args.repo, cancel).await?;

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&flows)?);
        }
        OutputFormat::Text => {
            if flows.is_empty() {
                println!("No convertible workflows in {}", args.repo);
            }
            for flow in &flows {
                print!("{}", describe_flow(flow));
            }
        }
    }
    Ok(())
}

pub async fn generate(
    args: GenerateArgs,
    config: &FsbConfig,
    cancel: &CancellationToken,
) -> Result<()> {
    let converter = Converter::from_config(config)?;
    let loader = Loader::from_config(config)?;
    let flows = loader.load(&args.repo, cancel).await?;
    converter.validate(&flows)?;

    fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create output directory {}", args.out.display()))?;
    for flow in &flows {
        let archive = converter.archive(flow)?;
        let path = archive_path(&args.out, flow);
        fs::write(&path, &archive)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(workflow = %flow.name, path = %path.display(), bytes = archive.len(), "wrote package");
        println!("{}", path.display());
    }
    Ok(())
}

pub async fn deploy(
    args: DeployArgs,
    mut config: FsbConfig,
    cancel: &CancellationToken,
) -> Result<()> {
    if let Some(group) = args.resource_group {
        config.azure.resource_group = group;
    }

    let converter = Converter::from_config(&config)?;
    let loader = Loader::from_config(&config)?;
    let flows = loader.load(&args.repo, cancel).await?;

    let arm = Arc::new(ArmClient::from_config(&config.azure)?);
    let blobs = Arc::new(AzureBlobUploader::new(
        arm.clone(),
        config.azure.sas_expiry_hours,
    ));
    let uploader = FunctionUploader::new(arm, blobs, config.azure.container.clone());

    let reports = deploy_all(&converter, &uploader, &flows, cancel).await?;
    let mut failed = 0;
    for report in &reports {
        match &report.outcome {
            Ok(deployment) => println!(
                "{}: deployed {} ({})",
                report.flow, deployment.deployment_name, deployment.deployment_id
            ),
            Err(err) => {
                failed += 1;
                println!("{}: failed: {}", report.flow, err.message);
            }
        }
    }

    if failed > 0 {
        return Err(anyhow!(
            "{} of {} workflows failed to deploy",
            failed,
            reports.len()
        ));
    }
    Ok(())
}

fn archive_path(out: &Path, flow: &LoadedFlow) -> PathBuf {
    out.join(format!("{}.zip", flow.name))
}

fn describe_flow(flow: &LoadedFlow) -> String {
    let mut out = format!("{}\n", flow.name);
    for trigger in &flow.triggers {
        if trigger.actions.is_empty() {
            out.push_str(&format!("  on: {}\n", trigger.event));
        } else {
            out.push_str(&format!(
                "  on: {} [{}]\n",
                trigger.event,
                trigger.actions.join(", ")
            ));
        }
    }
    for step in &flow.steps {
        out.push_str(&format!("  step: {} -> {}\n", step.name, step.filename()));
    }
    out
}
