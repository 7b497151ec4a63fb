//! Room visualizer command.

use std::path::{Path, PathBuf};

use furnish_flow_core::{Product, ProductId};
use furnish_flow_storefront::catalog::Catalog;
use furnish_flow_storefront::state::AppState;
use furnish_flow_storefront::visualizer::{DataUri, VisualizationRequest, VisualizerError};
use url::Url;

use crate::error::CliError;

/// Composite `product` into the photo at `room` and write the result.
#[allow(clippy::print_stdout)]
pub async fn run(
    state: &AppState,
    room: &Path,
    product: ProductId,
    furniture: Option<&str>,
    out: Option<PathBuf>,
) -> Result<(), CliError> {
    let visualizer = state
        .visualizer()
        .ok_or(CliError::NotConfigured("FURNISH_VISUALIZER_URL"))?;
    let product = state
        .catalog()
        .find_by_id(product)
        .await?
        .ok_or(CliError::UnknownProduct(product))?;

    let furniture_source = match furniture {
        Some(source) => source.to_string(),
        None => product.image_ref().to_string(),
    };
    if furniture_source.is_empty() {
        return Err(VisualizerError::UnsupportedImage(format!(
            "{} has no image; pass --furniture",
            product.name
        ))
        .into());
    }

    let room_photo = DataUri::from_file(room).await?;
    let furniture_photo = match Url::parse(&furniture_source) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            DataUri::fetch(visualizer.client(), &url).await?
        }
        _ => DataUri::from_file(Path::new(&furniture_source)).await?,
    };

    let request = VisualizationRequest {
        room_photo,
        furniture_photo,
        description: furniture_description(&product),
    };
    let image = visualizer.visualize(&request).await?;

    let out =
        out.unwrap_or_else(|| PathBuf::from(format!("visualized-room.{}", image.extension())));
    tokio::fs::write(&out, image.decode()?).await?;

    println!("Saved visualization to {}", out.display());
    Ok(())
}

/// Short description of the piece being placed, e.g. `A Modern Velvet Sofa.`
fn furniture_description(product: &Product) -> String {
    format!("A {}.", product.name)
}
