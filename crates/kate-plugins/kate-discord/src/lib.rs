//! # kate-discord
//!
//! Discord implementation of `ChatPlatform`, plus the gateway handler that
//! feeds reaction events into the vote registry and answers mentions.

use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use kate_core::models::{
    Announcement, MessageRef, ModerationNotice, ReactionEvent, MODERATION_FOOTER,
};
use kate_core::traits::ChatPlatform;
use kate_services::{MentionResponder, VoteRegistry};
use serenity::all::{
    ChannelId, Client, Colour, Context, CreateEmbed, CreateEmbedFooter, CreateMessage,
    EventHandler, ExecuteWebhook, GatewayIntents, Http, Message, MessageId, Reaction,
    ReactionType, Ready, Webhook, WebhookId,
};
use tracing::{debug, error, info, warn};

const ANNOUNCEMENT_COLOUR: Colour = Colour::new(0x0099FF);

/// Name and avatar the webhook posts under.
#[derive(Debug, Clone)]
pub struct AnnouncerIdentity {
    pub username: String,
    pub avatar_url: String,
}

pub struct DiscordChat {
    http: Arc<Http>,
    channel_id: ChannelId,
    webhook: Webhook,
    identity: AnnouncerIdentity,
}

impl DiscordChat {
    /// Resolves the announcement webhook up front so a bad id or token
    /// fails at start-up rather than after the first accepted vote.
    pub async fn connect(
        token: &str,
        channel_id: u64,
        webhook_id: u64,
        webhook_token: &str,
        identity: AnnouncerIdentity,
    ) -> anyhow::Result<Self> {
        let http = Arc::new(Http::new(token));
        let webhook = Webhook::from_id_with_token(&*http, WebhookId::new(webhook_id), webhook_token)
            .await
            .context("fetching announcement webhook")?;

        Ok(Self {
            http,
            channel_id: ChannelId::new(channel_id),
            webhook,
            identity,
        })
    }
}

#[async_trait]
impl ChatPlatform for DiscordChat {
    async fn post_moderation(&self, notice: &ModerationNotice) -> anyhow::Result<MessageRef> {
        let message = self
            .channel_id
            .send_message(&*self.http, moderation_message(notice))
            .await
            .with_context(|| format!("posting to channel {}", self.channel_id))?;

        Ok(MessageRef {
            channel_id: message.channel_id.get(),
            message_id: message.id.get(),
        })
    }

    async fn seed_reaction(&self, message: &MessageRef, emoji: &str) -> anyhow::Result<()> {
        ChannelId::new(message.channel_id)
            .create_reaction(
                &*self.http,
                MessageId::new(message.message_id),
                ReactionType::Unicode(emoji.to_string()),
            )
            .await
            .context("adding seed reaction")?;
        Ok(())
    }

    async fn announce(&self, announcement: &Announcement) -> anyhow::Result<()> {
        self.webhook
            .execute(&*self.http, false, announcement_webhook(announcement, &self.identity))
            .await
            .context("executing announcement webhook")?;
        Ok(())
    }
}

fn moderation_message(notice: &ModerationNotice) -> CreateMessage {
    let embed = CreateEmbed::new()
        .title(notice.title())
        .description(notice.insult.as_str())
        .field("Suggested by", notice.submitter.as_str(), false)
        .footer(CreateEmbedFooter::new(MODERATION_FOOTER));
    CreateMessage::new().embed(embed)
}

fn announcement_webhook(announcement: &Announcement, identity: &AnnouncerIdentity) -> ExecuteWebhook {
    let embed = CreateEmbed::new()
        .title(Announcement::TITLE)
        .description(announcement.description())
        .colour(ANNOUNCEMENT_COLOUR);
    ExecuteWebhook::new()
        .username(identity.username.as_str())
        .avatar_url(identity.avatar_url.as_str())
        .embed(embed)
}

fn emoji_name(emoji: &ReactionType) -> String {
    match emoji {
        ReactionType::Unicode(name) => name.clone(),
        ReactionType::Custom { name, .. } => name.clone().unwrap_or_default(),
        _ => String::new(),
    }
}

/// Gateway events this service reacts to.
pub struct GatewayHandler {
    votes: Arc<VoteRegistry>,
    responder: Arc<MentionResponder>,
}

impl GatewayHandler {
    pub fn new(votes: Arc<VoteRegistry>, responder: Arc<MentionResponder>) -> Self {
        Self { votes, responder }
    }
}

#[async_trait]
impl EventHandler for GatewayHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, "discord gateway connected");
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        match msg.mentions_me(&ctx).await {
            Ok(true) => {}
            Ok(false) => return,
            Err(e) => {
                warn!(error = %e, "could not check message mentions");
                return;
            }
        }

        let reply = self.responder.respond().await;
        if let Err(e) = msg.reply(&ctx, reply).await {
            error!(error = %e, channel_id = msg.channel_id.get(), "failed to reply to mention");
        }
    }

    /// Event-source failures are logged and leave the vote armed.
    async fn reaction_add(&self, ctx: Context, reaction: Reaction) {
        let message_id = reaction.message_id.get();
        if !self.votes.is_tracking(message_id) {
            return;
        }
        let Some(user_id) = reaction.user_id else {
            debug!(message_id, "reaction without a user id");
            return;
        };

        let user_is_bot = match &reaction.member {
            Some(member) => member.user.bot,
            None => match reaction.user(&ctx).await {
                Ok(user) => user.bot,
                Err(e) => {
                    error!(error = %e, message_id, "vote collector could not resolve reactor");
                    return;
                }
            },
        };

        let event = ReactionEvent {
            message_id,
            user_id: user_id.get(),
            user_is_bot,
            emoji: emoji_name(&reaction.emoji),
        };
        self.votes.dispatch(event).await;
    }
}

/// Builds the gateway client. Call `start()` on it to connect.
pub async fn gateway(token: &str, handler: GatewayHandler) -> anyhow::Result<Client> {
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MESSAGE_REACTIONS;

    Client::builder(token, intents)
        .event_handler(handler)
        .await
        .context("building discord client")
}
