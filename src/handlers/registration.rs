// Registration flow: choose group, enter name, then (cadets only) share a phone

use tracing::{info, warn};

use crate::core::error::HandlerError;
use crate::handlers::context::EventContext;
use crate::handlers::keyboards;
use crate::models::event::BotAction;
use crate::models::role::Role;
use crate::stores::sessions::RegistrationStep;
use crate::validation::registration::{normalize_phone, validate_full_name};

const PROMPT_OFFICER: &str = "Confirm registration as an officer:";
const PROMPT_GROUP: &str = "Choose your training group:";
const PROMPT_NAME: &str = "Enter your surname and initials (e.g. Ivanov I. I.)";
const PROMPT_CONTACT: &str =
    "Share your phone number with the button below or type it (e.g. +7 999 123-45-67).";

/// Phone input during the contact step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactInput {
    /// Native contact share; `owner_id` is whose contact it is
    Shared { owner_id: Option<i64>, phone: String },
    Manual(String),
}

fn group_prompt(ctx: &EventContext<'_>) -> &'static str {
    match ctx.role {
        Role::Officer => PROMPT_OFFICER,
        Role::AdminCadet | Role::PlainCadet => PROMPT_GROUP,
    }
}

fn role_mismatch_notice(role: Role) -> &'static str {
    match role {
        Role::Officer => "An officer can only register as an officer.",
        Role::AdminCadet | Role::PlainCadet => "Registration as an officer is not allowed for your account.",
    }
}

/// Reset to group selection and prompt with the role's own options
fn back_to_choose_group(ctx: &EventContext<'_>, notice: &str) -> Vec<BotAction> {
    ctx.state.sessions.set(ctx.from.user_id, RegistrationStep::ChooseGroup);
    vec![ctx.reply_with(
        format!("{}\n\n{}", notice, group_prompt(ctx)),
        keyboards::registration_groups(ctx.role, ctx.course()),
    )]
}

fn completion_text(ctx: &EventContext<'_>, group_code: &str, full_name: &str, phone: Option<&str>) -> String {
    let mut text = format!(
        "Registration complete.\n\nGroup: {}\nName: {}",
        ctx.course().group_label(group_code),
        full_name
    );
    if let Some(phone) = phone {
        text.push_str(&format!("\nPhone: {}", phone));
    }
    text
}

/// Registration-start trigger
pub fn start(ctx: &EventContext<'_>) -> Result<Vec<BotAction>, HandlerError> {
    let mut actions = vec![ctx.menu()];

    if let Some(cadet) = ctx.state.store.get_cadet(ctx.from.user_id)? {
        ctx.state.sessions.clear(ctx.from.user_id);
        actions.push(ctx.reply_with(
            format!(
                "You are already registered.\n\nGroup: {}\nName: {}",
                ctx.course().group_label(&cadet.group_code),
                cadet.full_name
            ),
            keyboards::registered_inline(),
        ));
        return Ok(actions);
    }

    ctx.state.sessions.set(ctx.from.user_id, RegistrationStep::ChooseGroup);
    actions.push(ctx.reply_with(
        group_prompt(ctx),
        keyboards::registration_groups(ctx.role, ctx.course()),
    ));

    Ok(actions)
}

/// Explicit restart; the committed record stays until a new one overwrites it
pub fn restart(ctx: &EventContext<'_>, callback_id: &str, message_id: Option<i64>) -> Vec<BotAction> {
    ctx.state.sessions.set(ctx.from.user_id, RegistrationStep::ChooseGroup);

    vec![
        BotAction::ack(callback_id),
        ctx.menu(),
        ctx.edit_or_reply(
            message_id,
            group_prompt(ctx),
            Some(keyboards::registration_groups(ctx.role, ctx.course())),
        ),
    ]
}

pub fn choose_group(
    ctx: &EventContext<'_>,
    callback_id: &str,
    message_id: Option<i64>,
    group_code: &str,
) -> Vec<BotAction> {
    if ctx.state.sessions.get(ctx.from.user_id) != Some(RegistrationStep::ChooseGroup) {
        return vec![BotAction::alert(
            callback_id,
            "Registration session expired. Send /start to begin again.",
        )];
    }

    if !ctx.role.may_register_in(group_code, ctx.course()) {
        warn!(
            user_id = ctx.from.user_id,
            role = ?ctx.role,
            group_code = %group_code,
            "Rejected group selection"
        );
        return vec![
            BotAction::alert(callback_id, role_mismatch_notice(ctx.role)),
            ctx.edit_or_reply(
                message_id,
                group_prompt(ctx),
                Some(keyboards::registration_groups(ctx.role, ctx.course())),
            ),
        ];
    }

    ctx.state.sessions.set(
        ctx.from.user_id,
        RegistrationStep::EnterName {
            group_code: group_code.to_string(),
        },
    );

    vec![
        BotAction::ack(callback_id),
        ctx.edit_or_reply(
            message_id,
            format!(
                "Group selected: {}\n\n{}",
                ctx.course().group_label(group_code),
                PROMPT_NAME
            ),
            None,
        ),
    ]
}

pub fn enter_name(ctx: &EventContext<'_>, group_code: &str, text: &str) -> Result<Vec<BotAction>, HandlerError> {
    let full_name = match validate_full_name(text) {
        Ok(name) => name,
        Err(e) => {
            info!(user_id = ctx.from.user_id, reason = %e, "Rejected name entry");
            return Ok(vec![ctx.reply(format!("Invalid format. {}", PROMPT_NAME))]);
        }
    };

    if !ctx.role.may_register_in(group_code, ctx.course()) {
        return Ok(back_to_choose_group(ctx, role_mismatch_notice(ctx.role)));
    }

    ctx.state.store.upsert_cadet(
        ctx.from.user_id,
        group_code,
        &full_name,
        ctx.from.username.as_deref(),
    )?;

    match ctx.role {
        Role::Officer => {
            ctx.state.sessions.clear(ctx.from.user_id);
            ctx.state.metrics.increment_registrations();
            info!(user_id = ctx.from.user_id, "Officer registered");

            Ok(vec![
                ctx.menu(),
                ctx.reply(completion_text(ctx, group_code, &full_name, None)),
            ])
        }
        Role::AdminCadet | Role::PlainCadet => {
            ctx.state.sessions.set(
                ctx.from.user_id,
                RegistrationStep::EnterContact {
                    group_code: group_code.to_string(),
                    full_name,
                },
            );

            Ok(vec![ctx.reply_with(PROMPT_CONTACT, keyboards::contact_request())])
        }
    }
}

pub fn enter_contact(
    ctx: &EventContext<'_>,
    group_code: &str,
    full_name: &str,
    input: ContactInput,
) -> Result<Vec<BotAction>, HandlerError> {
    if !ctx.role.may_register_in(group_code, ctx.course()) {
        return Ok(back_to_choose_group(ctx, role_mismatch_notice(ctx.role)));
    }

    let raw = match input {
        ContactInput::Shared { owner_id, phone } => {
            if owner_id != Some(ctx.from.user_id) {
                warn!(
                    user_id = ctx.from.user_id,
                    owner_id = ?owner_id,
                    "Rejected contact belonging to another user"
                );
                return Ok(vec![ctx.reply_with(
                    "Please share your own contact, not someone else's.",
                    keyboards::contact_request(),
                )]);
            }
            phone
        }
        ContactInput::Manual(text) => text,
    };

    let phone = match normalize_phone(&raw) {
        Ok(phone) => phone,
        Err(e) => {
            info!(user_id = ctx.from.user_id, reason = %e, "Rejected phone entry");
            return Ok(vec![ctx.reply_with(
                "Invalid phone number. Enter 11 digits starting with +7 or 8, e.g. +7 999 123-45-67.",
                keyboards::contact_request(),
            )]);
        }
    };

    ctx.state.store.set_phone(ctx.from.user_id, &phone)?;
    ctx.state.sessions.clear(ctx.from.user_id);
    ctx.state.metrics.increment_registrations();

    info!(user_id = ctx.from.user_id, group_code = %group_code, "Cadet registered");

    Ok(vec![
        ctx.menu(),
        ctx.reply(completion_text(ctx, group_code, full_name, Some(&phone))),
    ])
}
