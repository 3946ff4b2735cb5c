//! Discord REST adapter for the ledger's platform capabilities.
//!
//! Only the handful of guild endpoints the whitelist needs are used:
//! current user, guild roles, guild members and member role grants.

use crate::config::BotConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use gatehouse_ledger::{
    AccountKind, MemberEnumerator, PlatformError, RoleChecker, RoleGranter, RoleId, UserId,
};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// Page size for member listing (platform maximum).
const MEMBER_PAGE: usize = 1000;

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordUser {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuildMember {
    pub user: DiscordUser,
    #[serde(default)]
    pub roles: Vec<RoleId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuildRole {
    pub id: RoleId,
    pub name: String,
}

/// Platform client bound to one guild.
#[derive(Debug, Clone)]
pub struct DiscordClient {
    http: Client,
    api_base: String,
    guild_id: u64,
}

impl DiscordClient {
    pub fn new(config: &BotConfig) -> Result<Self> {
        Self::with_base(&config.api_base, &config.token, config.guild_id, config.grant_timeout)
    }

    pub fn with_base(api_base: &str, token: &str, guild_id: u64, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bot {}", token))
            .map_err(|_| Error::Config("token contains invalid characters".into()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!(
                "DiscordBot (gatehouse, ",
                env!("CARGO_PKG_VERSION"),
                ")"
            )),
        );

        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            guild_id,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// The bot's own account. Fails with `Authentication` on a bad token.
    pub async fn current_user(&self) -> Result<DiscordUser> {
        let resp = self
            .http
            .get(self.url("/users/@me"))
            .send()
            .await
            .map_err(http_error)?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication("platform rejected the bot token".into()));
        }
        Ok(checked(resp).await?.json().await.map_err(decode_error)?)
    }

    pub async fn guild_roles(&self) -> std::result::Result<Vec<GuildRole>, PlatformError> {
        let resp = self
            .http
            .get(self.url(&format!("/guilds/{}/roles", self.guild_id)))
            .send()
            .await
            .map_err(http_error)?;
        checked(resp).await?.json().await.map_err(decode_error)
    }

    /// Fail with a configuration error if the guild has no such role.
    pub async fn verify_role(&self, role: RoleId) -> Result<GuildRole> {
        self.guild_roles()
            .await?
            .into_iter()
            .find(|r| r.id == role)
            .ok_or_else(|| {
                gatehouse_ledger::Error::Configuration(format!(
                    "whitelist role {} not found in guild {}",
                    role, self.guild_id
                ))
                .into()
            })
    }

    /// Look up a guild member; `None` if the user is not in the guild.
    pub async fn member(&self, user: UserId) -> std::result::Result<Option<GuildMember>, PlatformError> {
        let resp = self
            .http
            .get(self.url(&format!("/guilds/{}/members/{}", self.guild_id, user)))
            .send()
            .await
            .map_err(http_error)?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        checked(resp).await?.json().await.map(Some).map_err(decode_error)
    }
}

#[async_trait]
impl RoleChecker for DiscordClient {
    async fn has_role(&self, user: UserId, role: RoleId) -> std::result::Result<bool, PlatformError> {
        Ok(self
            .member(user)
            .await?
            .is_some_and(|m| m.roles.contains(&role)))
    }

    async fn account_kind(&self, user: UserId) -> std::result::Result<AccountKind, PlatformError> {
        Ok(match self.member(user).await? {
            None => AccountKind::Absent,
            Some(m) if m.user.bot => AccountKind::Automated,
            Some(_) => AccountKind::Human,
        })
    }

    async fn role_exists(&self, role: RoleId) -> std::result::Result<bool, PlatformError> {
        Ok(self.guild_roles().await?.iter().any(|r| r.id == role))
    }
}

#[async_trait]
impl RoleGranter for DiscordClient {
    async fn grant_role(
        &self,
        user: UserId,
        role: RoleId,
        reason: &str,
    ) -> std::result::Result<(), PlatformError> {
        let mut request = self.http.put(self.url(&format!(
            "/guilds/{}/members/{}/roles/{}",
            self.guild_id, user, role
        )));
        if let Ok(reason) = HeaderValue::from_str(reason) {
            request = request.header("X-Audit-Log-Reason", reason);
        }

        let resp = request.send().await.map_err(http_error)?;
        checked(resp).await?;
        Ok(())
    }
}

#[async_trait]
impl MemberEnumerator for DiscordClient {
    async fn all_members(&self) -> std::result::Result<Vec<UserId>, PlatformError> {
        let mut members = Vec::new();
        let mut after = 0u64;

        loop {
            let resp = self
                .http
                .get(self.url(&format!("/guilds/{}/members", self.guild_id)))
                .query(&[("limit", MEMBER_PAGE.to_string()), ("after", after.to_string())])
                .send()
                .await
                .map_err(http_error)?;
            let page: Vec<GuildMember> = checked(resp).await?.json().await.map_err(decode_error)?;

            let len = page.len();
            for member in page {
                after = after.max(member.user.id.0);
                members.push(member.user.id);
            }
            if len < MEMBER_PAGE {
                break;
            }
        }

        Ok(members)
    }
}

async fn checked(resp: Response) -> std::result::Result<Response, PlatformError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(if status == StatusCode::NOT_FOUND {
        PlatformError::NotFound(body)
    } else {
        PlatformError::Status {
            status: status.as_u16(),
            body,
        }
    })
}

fn http_error(e: reqwest::Error) -> PlatformError {
    if e.is_timeout() {
        PlatformError::Timeout
    } else {
        PlatformError::Http(e.to_string())
    }
}

fn decode_error(e: reqwest::Error) -> PlatformError {
    PlatformError::Decode(e.to_string())
}
