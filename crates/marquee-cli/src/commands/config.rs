use crate::context::AppContext;
use crate::output::Output;
use crate::ConfigCommands;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use media_compose_config::Config;
use serde_json::json;

pub fn run_config(ctx: &AppContext, cmd: ConfigCommands, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show { full } => show_config(ctx, full, output),
        ConfigCommands::Init { base_url, token, force } => init_config(ctx, base_url, token, force, output),
    }
}

fn show_config(ctx: &AppContext, full: bool, output: &Output) -> Result<()> {
    let config = &ctx.config;
    let exists = ctx.config_file.exists();
    if !exists {
        output.warn(format!(
            "No config file at {}; showing defaults. Run 'marquee config init' to create one.",
            ctx.config_file.display()
        ));
    }

    let stored_token = ctx
        .credentials()
        .map_err(|e| eyre!("{:#}", e))?
        .resolve_api_token(config.backend.api_token.as_deref());
    let token_display = match &stored_token {
        Some(token) if full => token.clone(),
        Some(token) => mask_string(token),
        None => "<not set>".to_string(),
    };

    output.data(&json!({
        "config_file": ctx.config_file,
        "exists": exists,
        "api_token": token_display,
        "config": config,
    }));
    output.table(
        &["Setting", "Value"],
        vec![
            row("Config file", ctx.config_file.display()),
            row("backend.base_url", &config.backend.base_url),
            row("backend.timeout_secs", config.backend.timeout_secs),
            row("API token", &token_display),
            row("composer.search_debounce_ms", config.composer.search_debounce_ms),
            row("composer.default_list", &config.composer.default_list),
            row("composer.max_poll_options", config.composer.max_poll_options),
            row("metadata.genre_batch_size", config.metadata.genre_batch_size),
            row("metadata.genre_batch_delay_ms", config.metadata.genre_batch_delay_ms),
            row("logging.level", &config.logging.level),
            row("logging.json", config.logging.json),
            row(
                "logging.file",
                config
                    .logging
                    .file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<stderr>".to_string()),
            ),
        ],
    );
    Ok(())
}

fn init_config(
    ctx: &AppContext,
    base_url: Option<String>,
    token: Option<String>,
    force: bool,
    output: &Output,
) -> Result<()> {
    if ctx.config_file.exists() && !force {
        return Err(eyre!(
            "Config already exists at {} (use --force to overwrite)",
            ctx.config_file.display()
        ));
    }

    let mut config = Config::default();
    if let Some(base_url) = base_url {
        config.backend.base_url = base_url;
    }
    config.validate().map_err(|e| eyre!("Invalid configuration: {}", e))?;
    config
        .save_to_file(&ctx.config_file)
        .map_err(|e| eyre!("Failed to write {}: {}", ctx.config_file.display(), e))?;
    output.success(format!("Wrote {}", ctx.config_file.display()));

    if let Some(token) = token {
        let mut store = ctx.credentials().map_err(|e| eyre!("{:#}", e))?;
        store.set_api_token(token);
        store
            .save()
            .map_err(|e| eyre!("Failed to save credentials: {}", e))?;
        output.success(format!("Stored API token in {}", ctx.paths.credentials_file().display()));
    }
    Ok(())
}

fn row(name: &str, value: impl ToString) -> Vec<String> {
    vec![name.to_string(), value.to_string()]
}

fn mask_string(s: &str) -> String {
    if s.is_empty() {
        return "<not set>".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_string() {
        assert_eq!(mask_string(""), "<not set>");
        assert_eq!(mask_string("abcd"), "****");
        assert_eq!(mask_string("tok_123456"), "to***56");
    }
}
