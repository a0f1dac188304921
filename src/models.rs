use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct RegisterReq {
    #[schema(example = "Asha Rao")]
    pub name: String,
    #[schema(example = "asha@college.edu", format = "email")]
    pub email: String,
    #[schema(example = "+91 98450 00000")]
    pub contact: String,
    #[schema(example = "s3cret-pass")]
    pub password: String,
    #[schema(example = "B.Tech CSE")]
    pub course: Option<String>,
    #[schema(example = 5)]
    pub semester: Option<u8>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    /// The account email
    #[schema(example = "asha@college.edu")]
    pub username: String,
    #[schema(example = "s3cret-pass")]
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    /// username (the account email)
    pub sub: String,
    /// role column value, e.g. `student`
    pub role: String,
    pub exp: usize,
    pub jti: String,
}
