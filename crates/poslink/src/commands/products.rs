//! Product catalog commands.

use poslink_api::{ApiClient, ProductQuery, SortOrder};

use crate::cli::{ProductFilter, ProductsArgs, ProductsCommand, SortOrderArg};
use crate::error::CliError;
use crate::output;

pub async fn handle(client: &ApiClient, args: ProductsArgs) -> Result<(), CliError> {
    let value = match args.command {
        ProductsCommand::List(filter) => client.products(&query_from(filter)).await?,
        ProductsCommand::Get { id } => client.product(&id).await?,
        ProductsCommand::Barcode { code } => {
            client.products(&ProductQuery::barcode(code)).await?
        }
    };
    output::print_output(&output::render_json(&value)?);
    Ok(())
}

fn query_from(filter: ProductFilter) -> ProductQuery {
    ProductQuery {
        search: filter.search,
        category: filter.category,
        barcode: None,
        min_price: filter.min_price,
        max_price: filter.max_price,
        min_rating: filter.min_rating,
        in_stock: filter.in_stock.then_some(true),
        sort_by: filter.sort_by,
        sort_order: filter.sort_order.map(|o| match o {
            SortOrderArg::Asc => SortOrder::Asc,
            SortOrderArg::Desc => SortOrder::Desc,
        }),
        page: filter.page,
        limit: filter.limit,
    }
}
