use anyhow::Context;
use serde_json::json;
use tracing::{info, warn};

use food_admin_lib::config::{ORDERS_PATH, PRODUCTS_PATH};
use food_admin_lib::logging::init_logging;
use food_admin_lib::models::{Order, Product};
use food_admin_lib::{AdminClient, AdminConfig, ListQueryController};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AdminConfig::from_env().context("loading configuration")?;
    let _guard = init_logging(&config).context("initializing logging")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_sha = env!("BUILD_GIT_SHA"),
        origin = %config.api_origin,
        "Starting food-admin"
    );

    let search = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let page_size = i64::from(config.default_page_size);
    let client = AdminClient::new(&config).context("building HTTP client")?;

    let products =
        ListQueryController::<Product>::http("products", client.clone(), PRODUCTS_PATH, &config);
    let orders = ListQueryController::<Order>::http("orders", client.clone(), ORDERS_PATH, &config);

    let (product_page, order_page) = tokio::join!(
        products.request_page(1, &search, page_size),
        orders.request_page(1, "", page_size),
    );

    for controller_error in [products.last_error(), orders.last_error()].into_iter().flatten() {
        warn!(error = %controller_error, "list request failed");
    }

    let categories = match client.fetch_categories().await {
        Ok(categories) => categories,
        Err(e) => {
            warn!(error = %e, "category request failed");
            Vec::new()
        }
    };

    let fallback = config.grand_total_fallback;
    let order_rows: Vec<_> = order_page
        .items
        .iter()
        .map(|order| json!({ "order": order, "totals": order.totals(fallback) }))
        .collect();

    let report = json!({
        "search": search,
        "categories": categories,
        "products": product_page,
        "products_error": products.last_error().map(|e| e.to_string()),
        "orders": {
            "items": order_rows,
            "current_page": order_page.current_page,
            "last_page": order_page.last_page,
            "page_size": order_page.page_size,
            "total": order_page.total,
        },
        "orders_error": orders.last_error().map(|e| e.to_string()),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
