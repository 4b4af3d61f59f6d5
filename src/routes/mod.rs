mod auth;
mod health_check;

pub use auth::{
    get_current_user, logout, refresh, AccessTokenResponse, UserResponse, REFRESH_COOKIE,
    REFRESH_COOKIE_PATH,
};
pub use health_check::{health_check, index};
