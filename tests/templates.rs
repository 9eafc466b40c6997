// tests/templates.rs

use ngwf::dag::template::{render_command, TemplateContext};

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_all_placeholders_are_substituted() {
    let data = owned(&["r1.fq", "r2.fq"]);
    let injobs = owned(&["qc", "trim"]);
    let opts = owned(&["--careful", "-k21"]);
    let ctx = TemplateContext {
        sample: "S1",
        job: "assemble",
        data: &data,
        injobs: &injobs,
        cmd_opts: &opts,
    };

    let rendered = render_command(
        r"spades -1 \INJOBS.1/\DATA.0 -2 \INJOBS.1/\DATA.1 \CMDOPTS.0 \CMDOPTS.1 -o \SELF --name \SAMPLE",
        &ctx,
    );
    assert_eq!(
        rendered,
        "spades -1 trim/r1.fq -2 trim/r2.fq --careful -k21 -o assemble --name S1"
    );
}

#[test]
fn test_two_digit_index_is_not_clobbered() {
    let data: Vec<String> = (0..11).map(|i| format!("f{i}")).collect();
    let ctx = TemplateContext {
        sample: "S",
        job: "j",
        data: &data,
        injobs: &[],
        cmd_opts: &[],
    };

    assert_eq!(render_command(r"\DATA.10 \DATA.1", &ctx), "f10 f1");
}

#[test]
fn test_out_of_range_placeholder_is_left_verbatim() {
    ngwf_test_utils::init_tracing();
    let data = owned(&["only"]);
    let ctx = TemplateContext {
        sample: "S",
        job: "j",
        data: &data,
        injobs: &[],
        cmd_opts: &[],
    };

    assert_eq!(
        render_command(r"cat \DATA.0 \DATA.3 \INJOBS.0", &ctx),
        r"cat only \DATA.3 \INJOBS.0"
    );
}

#[test]
fn test_substituted_values_are_not_rescanned() {
    let data = owned(&[r"\SAMPLE"]);
    let ctx = TemplateContext {
        sample: "S9",
        job: "j",
        data: &data,
        injobs: &[],
        cmd_opts: &[],
    };

    assert_eq!(render_command(r"echo \DATA.0 \SAMPLE", &ctx), r"echo \SAMPLE S9");
}
