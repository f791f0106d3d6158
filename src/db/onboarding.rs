//! Client creation from free-text form input.
//!
//! Country and city names are resolved to ids (created when unknown), the
//! client is inserted, and an optional first product is resolved by name and
//! language and attached to the client. Everything runs in one transaction.

use super::client_products::NewClientProduct;
use super::clients::NewClient;
use super::db::{Db, Session};
use super::error::{DbError, DbResult};
use super::products::{NewProduct, DEFAULT_LANGUAGE_CODE};
use super::rows::require_text;
use serde::{Deserialize, Serialize};

/// Form payload for a new client. Prices arrive as text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientOnboarding {
    pub client_name: String,
    pub company_name: Option<String>,
    pub primary_need_description: Option<String>,
    pub project_identifier: Option<String>,
    pub country_name: String,
    pub city_name: String,
    pub default_base_folder_path: Option<String>,
    pub status_id: Option<i64>,
    pub selected_languages: Option<String>,
    pub price: Option<String>,
    pub notes: Option<String>,
    pub category: Option<String>,
    pub created_by_user_id: Option<String>,
    pub product_product_name: Option<String>,
    pub product_description: Option<String>,
    pub product_language_code: Option<String>,
    pub product_base_unit_price: Option<String>,
    pub product_unit_of_measure: Option<String>,
}

/// Ids produced by an onboarding run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Onboarded {
    pub client_id: String,
    pub country_id: i64,
    pub city_id: i64,
    pub product_id: Option<i64>,
    pub client_product_id: Option<i64>,
}

fn parse_price(field: &str, value: Option<&str>) -> DbResult<f64> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(0.0),
        Some(text) => text
            .replace(',', ".")
            .parse::<f64>()
            .map_err(|_| DbError::validation(field, format!("'{}' is not a number", text))),
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub fn onboard_client(db: &Db, form: &ClientOnboarding) -> DbResult<Onboarded> {
    require_text("client_name", &form.client_name)?;
    require_text("country_name", &form.country_name)?;
    require_text("city_name", &form.city_name)?;
    let price = parse_price("price", form.price.as_deref())?;
    let product_name = non_blank(&form.product_product_name);
    let product_price = parse_price("product_base_unit_price", form.product_base_unit_price.as_deref())?;

    db.transaction(|session: Session<'_>| {
        let country_id = session.countries().get_or_add(&form.country_name)?.id;
        let city_id = session.cities().get_or_add(country_id, &form.city_name)?.id;

        let client_id = session.clients().add(&NewClient {
            client_name: form.client_name.clone(),
            company_name: form.company_name.clone(),
            primary_need_description: form.primary_need_description.clone(),
            project_identifier: form.project_identifier.clone(),
            country_id: Some(country_id),
            city_id: Some(city_id),
            default_base_folder_path: form.default_base_folder_path.clone(),
            status_id: form.status_id,
            selected_languages: form.selected_languages.clone(),
            price,
            notes: form.notes.clone(),
            category: form.category.clone(),
            created_by_user_id: form.created_by_user_id.clone(),
        })?;

        let (product_id, client_product_id) = match product_name {
            None => (None, None),
            Some(name) => {
                let product_id = session
                    .products()
                    .get_or_add(&NewProduct {
                        product_name: name.to_string(),
                        description: form.product_description.clone(),
                        language_code: non_blank(&form.product_language_code).unwrap_or(DEFAULT_LANGUAGE_CODE).to_string(),
                        base_unit_price: product_price,
                        unit_of_measure: form.product_unit_of_measure.clone(),
                        ..Default::default()
                    })?
                    .id;
                let link_id = session.client_products().add(&NewClientProduct::new(client_id.clone(), product_id))?;
                (Some(product_id), Some(link_id))
            }
        };

        Ok(Onboarded {
            client_id,
            country_id,
            city_id,
            product_id,
            client_product_id,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prices_accept_comma_decimals() {
        assert_eq!(parse_price("price", Some("199,99")).unwrap(), 199.99);
        assert_eq!(parse_price("price", Some(" 12.5 ")).unwrap(), 12.5);
        assert_eq!(parse_price("price", None).unwrap(), 0.0);
        assert_eq!(parse_price("price", Some("")).unwrap(), 0.0);
    }

    #[test]
    fn garbage_price_is_a_validation_error() {
        let err = parse_price("product_base_unit_price", Some("cheap")).unwrap_err();
        assert!(matches!(err, DbError::Validation { .. }));
    }
}
