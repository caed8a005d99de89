// Admin-cadet and officer menu actions: missing lists, stats and rosters

use tracing::{info, warn};

use crate::core::error::HandlerError;
use crate::handlers::checkin::NOT_CHECKIN_TIME;
use crate::handlers::context::EventContext;
use crate::handlers::keyboards;
use crate::models::event::BotAction;
use crate::models::role::Role;
use crate::report::formatter::{
    course_round_report, group_missing_report, group_roster, group_round_report,
};

const MY_GROUP_TITLE: &str = "Stats: my group";

/// Own training group of an admin-cadet, or the guidance text to reply with
fn own_group(ctx: &EventContext<'_>) -> Result<Result<String, &'static str>, HandlerError> {
    let cadet = ctx.state.store.get_cadet(ctx.from.user_id)?;

    Ok(match cadet {
        None => Err("You are not registered. Use /start and register in your training group."),
        Some(c) if c.group_code == ctx.course().officers_code => {
            Err("Unavailable: your account is registered as an officer.")
        }
        Some(c) => Ok(c.group_code),
    })
}

/// "Not reported" for the admin's own group during an active window
pub fn not_reported(ctx: &EventContext<'_>) -> Result<Vec<BotAction>, HandlerError> {
    if ctx.role != Role::AdminCadet {
        return Ok(Vec::new());
    }

    let group_code = match own_group(ctx)? {
        Ok(code) => code,
        Err(guidance) => return Ok(vec![ctx.reply(guidance)]),
    };

    let Some(key) = ctx.state.windows.current_key(&ctx.now) else {
        return Ok(vec![ctx.reply(NOT_CHECKIN_TIME)]);
    };

    let missing = ctx.state.store.missing_in_group(&group_code, &key)?;
    Ok(ctx.reply_chunked(&group_missing_report(&group_code, &missing)))
}

pub fn my_group_stats(ctx: &EventContext<'_>) -> Result<Vec<BotAction>, HandlerError> {
    if ctx.role != Role::AdminCadet {
        return Ok(Vec::new());
    }

    let text = match own_group(ctx)? {
        Ok(code) => {
            let n = ctx.state.store.count_in_group(&code)?;
            format!("{}\n\n{}: {}", MY_GROUP_TITLE, code, n)
        }
        Err(guidance) => format!("{}\n\n{}", MY_GROUP_TITLE, guidance),
    };

    Ok(vec![ctx.reply(text)])
}

pub fn officer_pick_group(ctx: &EventContext<'_>) -> Vec<BotAction> {
    if ctx.role != Role::Officer {
        return Vec::new();
    }

    vec![ctx.reply_with(
        "Choose a training group:",
        keyboards::officer_groups(ctx.course()),
    )]
}

/// Count and roster for a group picked from the officer keyboard
pub fn officer_group_stats(
    ctx: &EventContext<'_>,
    callback_id: &str,
    message_id: Option<i64>,
    group_code: &str,
) -> Result<Vec<BotAction>, HandlerError> {
    if ctx.role != Role::Officer {
        warn!(user_id = ctx.from.user_id, "Non-officer pressed an officer group button");
        return Ok(vec![BotAction::alert(callback_id, "Insufficient rights")]);
    }

    if !ctx.course().is_training_group(group_code) {
        return Ok(vec![BotAction::alert(callback_id, "Unknown group")]);
    }

    let roster = ctx.state.store.list_group_roster(group_code)?;

    let mut actions = vec![
        BotAction::ack(callback_id),
        ctx.edit_or_reply(
            message_id,
            format!("Stats: selected group\n\n{}: {}", group_code, roster.len()),
            Some(keyboards::officer_groups(ctx.course())),
        ),
    ];
    actions.extend(ctx.reply_chunked(&group_roster(group_code, &roster)));

    Ok(actions)
}

pub fn course_stats(ctx: &EventContext<'_>) -> Result<Vec<BotAction>, HandlerError> {
    if ctx.role != Role::Officer {
        return Ok(Vec::new());
    }

    let officers_code = &ctx.course().officers_code;
    let total = ctx.state.store.count_in_course(officers_code)?;
    let by_group = ctx.state.store.count_by_group(officers_code)?;

    let mut lines = vec![
        "Stats: whole course".to_string(),
        String::new(),
        format!("Registered in total (officers excluded): {}", total),
        String::new(),
    ];
    lines.extend(by_group.iter().map(|(g, n)| format!("{}: {}", g, n)));

    Ok(ctx.reply_chunked(&lines.join("\n")))
}

/// Missing report for the most recently closed window
pub fn last_report(ctx: &EventContext<'_>) -> Result<Vec<BotAction>, HandlerError> {
    let key = ctx.state.windows.last_closed_slot(&ctx.now);

    let text = match ctx.role {
        Role::Officer => {
            let missing = ctx
                .state
                .store
                .missing_course(&key, &ctx.course().officers_code)?;
            course_round_report(&key, &missing)
        }
        Role::AdminCadet => match own_group(ctx)? {
            Ok(code) => {
                let missing = ctx.state.store.missing_in_group(&code, &key)?;
                group_round_report(&key, &code, &missing)
            }
            Err(guidance) => guidance.to_string(),
        },
        Role::PlainCadet => return Ok(Vec::new()),
    };

    info!(
        user_id = ctx.from.user_id,
        role = ?ctx.role,
        date = %key.date_str(),
        slot = %key.slot,
        "Last report requested"
    );

    Ok(ctx.reply_chunked(&text))
}

pub fn nav_back(ctx: &EventContext<'_>, callback_id: &str, message_id: Option<i64>) -> Vec<BotAction> {
    vec![
        BotAction::ack(callback_id),
        ctx.edit_or_reply(message_id, "Choose an action from the menu below.", None),
    ]
}
