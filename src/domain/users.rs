//! User record schemas, composed from reusable address, geo and company parts.

use roster_api_types::{Address, Company, CreateUser, Geo, User};
use serde_json::Value;

use super::schema::{
    Fields, SafeParse, Schema, SchemaExt, ValidationError, array, integer, object, string,
};

pub const ID_MESSAGE: &str = "ID must be a positive integer";
pub const NAME_MESSAGE: &str = "Name is required";
pub const USERNAME_MESSAGE: &str = "Username is required";
pub const EMAIL_MESSAGE: &str = "Invalid email format";

pub fn geo_schema() -> impl Schema<Output = Geo> {
    object(|f| {
        let lat = f.field("lat", &string());
        let lng = f.field("lng", &string());
        Some(Geo {
            lat: lat?,
            lng: lng?,
        })
    })
}

pub fn address_schema() -> impl Schema<Output = Address> {
    object(|f| {
        let street = f.field("street", &string());
        let suite = f.field("suite", &string());
        let city = f.field("city", &string());
        let zipcode = f.field("zipcode", &string());
        let geo = f.field("geo", &geo_schema());
        Some(Address {
            street: street?,
            suite: suite?,
            city: city?,
            zipcode: zipcode?,
            geo: geo?,
        })
    })
}

pub fn company_schema() -> impl Schema<Output = Company> {
    object(|f| {
        let name = f.field("name", &string());
        let catch_phrase = f.field("catchPhrase", &string());
        let bs = f.field("bs", &string());
        Some(Company {
            name: name?,
            catch_phrase: catch_phrase?,
            bs: bs?,
        })
    })
}

/// Server-assigned identifiers are positive integers.
pub fn user_id_schema() -> impl Schema<Output = u64> {
    integer().positive(ID_MESSAGE).transform(i64::unsigned_abs)
}

pub fn user_schema() -> impl Schema<Output = User> {
    object(|f| {
        let id = f.field("id", &user_id_schema());
        let rest = user_fields(f);
        Some(rest?.with_id(id?))
    })
}

/// The user shape without its identifier.
pub fn create_user_schema() -> impl Schema<Output = CreateUser> {
    object(user_fields)
}

pub fn users_schema() -> impl Schema<Output = Vec<User>> {
    array(user_schema())
}

fn user_fields(f: &mut Fields<'_>) -> Option<CreateUser> {
    let name = f.field("name", &string().min(1, NAME_MESSAGE));
    let username = f.field("username", &string().min(1, USERNAME_MESSAGE));
    let email = f.field("email", &string().email(EMAIL_MESSAGE));
    let address = f.field("address", &address_schema());
    let phone = f.field("phone", &string().optional());
    let website = f.field("website", &string().optional());
    let company = f.field("company", &company_schema().optional());
    Some(CreateUser {
        name: name?,
        username: username?,
        email: email?,
        address: address?,
        phone: phone?,
        website: website?,
        company: company?,
    })
}

pub fn validate_user(value: &Value) -> Result<User, ValidationError> {
    user_schema().parse(value)
}

pub fn safe_validate_user(value: &Value) -> SafeParse<User> {
    user_schema().safe_parse(value)
}

pub fn validate_create_user(value: &Value) -> Result<CreateUser, ValidationError> {
    create_user_schema().parse(value)
}

pub fn safe_validate_create_user(value: &Value) -> SafeParse<CreateUser> {
    create_user_schema().safe_parse(value)
}

pub fn validate_users(value: &Value) -> Result<Vec<User>, ValidationError> {
    users_schema().parse(value)
}
