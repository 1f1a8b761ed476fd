//! Post record schema.

use roster_api_types::Post;
use serde_json::Value;

use super::schema::{Schema, SchemaExt, ValidationError, array, integer, object, string};

const POST_ID_MESSAGE: &str = "ID must be a positive integer";
const OWNER_ID_MESSAGE: &str = "User ID must be a positive integer";

pub fn post_schema() -> impl Schema<Output = Post> {
    object(|f| {
        let user_id = f.field(
            "userId",
            &integer().positive(OWNER_ID_MESSAGE).transform(i64::unsigned_abs),
        );
        let id = f.field(
            "id",
            &integer().positive(POST_ID_MESSAGE).transform(i64::unsigned_abs),
        );
        let title = f.field("title", &string());
        let body = f.field("body", &string());
        Some(Post {
            user_id: user_id?,
            id: id?,
            title: title?,
            body: body?,
        })
    })
}

pub fn posts_schema() -> impl Schema<Output = Vec<Post>> {
    array(post_schema())
}

pub fn validate_post(value: &Value) -> Result<Post, ValidationError> {
    post_schema().parse(value)
}

pub fn validate_posts(value: &Value) -> Result<Vec<Post>, ValidationError> {
    posts_schema().parse(value)
}
