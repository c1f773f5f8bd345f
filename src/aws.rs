use aws_config::meta::region::RegionProviderChain;
use aws_config::{Region, SdkConfig};

/// Loads the shared SDK configuration, preferring an explicit `--region`
/// flag over the default provider chain, falling back to `us-east-1`.
///
/// `endpoint_url` overrides the service endpoint, e.g. for localstack.
pub async fn sdk_config(region: Option<String>, endpoint_url: Option<String>) -> SdkConfig {
    let region_provider = RegionProviderChain::first_try(region.map(Region::new))
        .or_default_provider()
        .or_else(Region::new("us-east-1"));

    let mut loader = aws_config::from_env().region(region_provider);
    if let Some(endpoint_url) = endpoint_url {
        loader = loader.endpoint_url(endpoint_url);
    }
    loader.load().await
}
