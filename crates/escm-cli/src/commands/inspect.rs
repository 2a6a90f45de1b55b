use std::io::Write;

use anyhow::Context;
use escm_topology::{InstanceAttribute, TopologyController};

use crate::cli::OutputFormat;

pub async fn instances(
    controller: &TopologyController,
    cluster_name: &str,
    format: OutputFormat,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let ids = controller
        .list_instance_ids(cluster_name)
        .await
        .with_context(|| format!("failed to list instances of cluster {cluster_name}"))?;

    match format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&ids)?)?,
        OutputFormat::Text => {
            for id in &ids {
                writeln!(out, "{id}")?;
            }
        }
    }
    Ok(())
}

pub async fn params(
    controller: &TopologyController,
    cluster_name: &str,
    parameter_name: &str,
    format: OutputFormat,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let attribute: InstanceAttribute = parameter_name.parse()?;
    let values = controller
        .list_attribute(cluster_name, &attribute)
        .await
        .with_context(|| format!("failed to list {attribute} for cluster {cluster_name}"))?;

    match format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&values)?)?,
        OutputFormat::Text => {
            for v in &values {
                writeln!(out, "{}\t{}", v.instance_id, v.value.as_deref().unwrap_or("-"))?;
            }
        }
    }
    Ok(())
}
