//! Input checks applied before any store call.

use common::{Address, NewCreditCard, NewCustomer, NewProduct, Page, ProfileUpdate};

use crate::error::DomainError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Largest accepted product price, one billion in cents.
pub const MAX_PRICE_CENTS: i64 = 100_000_000_000;

/// Largest quantity accepted in a single order or cart line request.
pub const MAX_ITEM_QUANTITY: i32 = 10_000;

type Result<T = ()> = std::result::Result<T, DomainError>;

/// Trims and lowercases an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn non_blank(field: &str, value: &str) -> Result {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} must not be blank")));
    }
    Ok(())
}

pub fn email(email: &str) -> Result {
    let invalid = || DomainError::validation(format!("invalid email address: {email}"));

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid());
    }
    Ok(())
}

pub fn password(password: &str) -> Result {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn page(page: &Page) -> Result {
    if page.number < 1 {
        return Err(DomainError::validation("page must be at least 1"));
    }
    if page.size < 1 {
        return Err(DomainError::validation("size must be at least 1"));
    }
    Ok(())
}

pub fn quantity(quantity: i32) -> Result {
    if quantity < 1 {
        return Err(DomainError::validation("quantity must be at least 1"));
    }
    if quantity > MAX_ITEM_QUANTITY {
        return Err(DomainError::validation(format!(
            "quantity must not exceed {MAX_ITEM_QUANTITY}"
        )));
    }
    Ok(())
}

pub fn new_customer(customer: &NewCustomer) -> Result {
    non_blank("first name", &customer.first_name)?;
    non_blank("last name", &customer.last_name)?;
    email(&customer.email)
}

pub fn profile(profile: &ProfileUpdate) -> Result {
    non_blank("first name", &profile.first_name)?;
    non_blank("last name", &profile.last_name)?;
    email(&profile.email)
}

pub fn address(address: &Address) -> Result {
    non_blank("country", &address.country)?;
    non_blank("state", &address.state)?;
    non_blank("city", &address.city)?;
    non_blank("postal code", &address.postal_code)?;
    non_blank("address", &address.address)
}

fn digits(value: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&value.len()) && value.chars().all(|c| c.is_ascii_digit())
}

pub fn credit_card(card: &NewCreditCard) -> Result {
    non_blank("card name", &card.name)?;
    if !digits(&card.number, 12, 19) {
        return Err(DomainError::validation("card number must be 12 to 19 digits"));
    }
    if !digits(&card.cvc, 3, 4) {
        return Err(DomainError::validation("cvc must be 3 or 4 digits"));
    }
    expiry(&card.expiry)
}

/// Accepts `MM/YY` with a month between 01 and 12.
fn expiry(expiry: &str) -> Result {
    let invalid = || DomainError::validation("expiry must be in MM/YY format");

    let (month, year) = expiry.split_once('/').ok_or_else(invalid)?;
    if !digits(month, 2, 2) || !digits(year, 2, 2) {
        return Err(invalid());
    }
    match month.parse::<u8>() {
        Ok(1..=12) => Ok(()),
        _ => Err(invalid()),
    }
}

pub fn new_product(product: &NewProduct) -> Result {
    non_blank("product name", &product.name)?;
    let old_negative = product.price.old.is_some_and(|old| old.is_negative());
    if product.price.current.is_negative() || old_negative {
        return Err(DomainError::validation("price must not be negative"));
    }
    let too_high = |cents: i64| cents > MAX_PRICE_CENTS;
    if too_high(product.price.current.cents())
        || product.price.old.is_some_and(|old| too_high(old.cents()))
    {
        return Err(DomainError::validation(format!(
            "price must not exceed {MAX_PRICE_CENTS} cents"
        )));
    }
    if product.quantity < 0 {
        return Err(DomainError::validation("quantity must not be negative"));
    }
    Ok(())
}
