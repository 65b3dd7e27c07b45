use crate::{spotify::auth::OAuthClient, utils};

use super::load_config;

pub async fn auth_url() {
    let config = load_config();
    let client = OAuthClient::new(&config.spotify);
    println!("{}", client.authorization_url(&utils::generate_state()));
}
