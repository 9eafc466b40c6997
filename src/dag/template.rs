// src/dag/template.rs

//! Command template rendering.
//!
//! Placeholders:
//! - `\SAMPLE`      current sample id
//! - `\SELF`        current job id
//! - `\DATA.n`      n-th data field of the sample
//! - `\INJOBS.n`    n-th upstream job id
//! - `\CMDOPTS.n`   n-th option override
//!
//! Substitution happens in a single pass so `\DATA.10` is never clobbered by
//! the replacement for `\DATA.1`.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::warn;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(?:(SAMPLE)|(SELF)|(DATA|INJOBS|CMDOPTS)\.(\d+))")
        .expect("placeholder regex is valid")
});

/// Values available to a single (job, sample) rendering.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    pub sample: &'a str,
    pub job: &'a str,
    pub data: &'a [String],
    pub injobs: &'a [String],
    pub cmd_opts: &'a [String],
}

/// Render a command template. Out-of-range indices are left verbatim.
pub fn render_command(template: &str, ctx: &TemplateContext<'_>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            if caps.get(1).is_some() {
                return ctx.sample.to_string();
            }
            if caps.get(2).is_some() {
                return ctx.job.to_string();
            }

            let source = match &caps[3] {
                "DATA" => ctx.data,
                "INJOBS" => ctx.injobs,
                _ => ctx.cmd_opts,
            };
            let value = caps[4].parse::<usize>().ok().and_then(|i| source.get(i));

            match value {
                Some(v) => v.clone(),
                None => {
                    warn!(
                        job = %ctx.job,
                        sample = %ctx.sample,
                        placeholder = %&caps[0],
                        "placeholder index out of range; leaving it unchanged"
                    );
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}
