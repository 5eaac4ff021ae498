use ahk_deobfuscate_rs::deobfuscate::section_filter::filter_document;
use ahk_deobfuscate_rs::{
    Category, DeobfuscateContext, DeobfuscateError, Document, Options, deobfuscate,
};
use std::collections::HashSet;

#[test]
fn test_filter_is_idempotent() {
    let script = "\
start()
Check_ForUpdate() {
    UrlDownloadToFile, http://example.com/v.txt, v.txt
    if (ErrorLevel) {
        return
    }
}
Gosub, Check_ForUpdate
Run, ping.exe -n 1 example.com
@kf#:
keep_me()
";
    let options = Options::default();

    let first = filter_document(&Document::parse(script), &options).unwrap();
    let second = filter_document(&Document::from_lines(first.kept_lines()), &options).unwrap();

    assert_eq!(first.kept_lines(), ["start()", "keep_me()"]);
    assert_eq!(second.summary.dropped_lines, 0);
    assert!(second.summary.spans.is_empty());
    assert_eq!(second.kept_lines(), first.kept_lines());
}

#[test]
fn test_names_unique_within_category() {
    let alphabet = ['@', '#', 'f', 'k'];
    let mut script = String::new();
    for a in alphabet {
        for b in alphabet {
            for c in alphabet {
                script.push_str(&format!("%{a}{b}{c}%(1)\n%{b}{c}%\nGoto, %{c}{a}{b}{c}%\n"));
            }
        }
    }

    let result = deobfuscate(&script, &Options::default()).unwrap();

    let mut seen = HashSet::new();
    for entry in result.mapping.entries() {
        assert!(
            seen.insert((entry.category, entry.name.clone())),
            "duplicate name {}",
            entry.name
        );
    }
    assert_eq!(seen.len(), result.mapping.len());
    assert!(result.mapping.count_in(Category::FunctionCall) >= 64);
}

#[test]
fn test_every_mapped_token_is_replaced() {
    let script = "\
%kf%(1)
x := \"@k#@k#@k#\" . %kf%
MsgBox, %f@%%kf%
if %f@%
    Send, \"@k#@k#@k#\"
";
    let options = Options::default();
    let result = deobfuscate(script, &options).unwrap();

    assert_eq!(result.mapping.len(), 3);
    for entry in result.mapping.entries() {
        for form in entry.forms.iter() {
            let delimited = form.delimit(&entry.raw, &options);
            assert!(
                !result.output.contains(&delimited),
                "{delimited} left in output:\n{}",
                result.output
            );
        }
    }
}

#[test]
fn test_longest_token_wins() {
    let script = "%AB%(1)\n%ABC%(2)\nx := %AB% + %ABC%\n";

    let result = deobfuscate(script, &Options::default()).unwrap();

    let ab = result.mapping.name_of("AB").unwrap();
    let abc = result.mapping.name_of("ABC").unwrap();
    assert_ne!(ab, abc);

    let lines: Vec<&str> = result.output.lines().collect();
    assert_eq!(lines[1], format!("{abc}(2)"));
    assert_eq!(lines[2], format!("x := {ab} + {abc}"));
    assert!(!result.output.contains("C%"));
}

#[test]
fn test_update_function_body_removed() {
    let options = Options::default();

    let single_line = "Check_ForUpdate() { a() { b() } c() }\nkeep_me()\n";
    let result = deobfuscate(single_line, &options).unwrap();
    assert_eq!(result.output, "keep_me()\n");

    let multi_line = "\
Check_ForUpdate() {
    a() {
        b()
    }
    c()
}
keep_me()
";
    let result = deobfuscate(multi_line, &options).unwrap();
    assert_eq!(result.output, "keep_me()\n");
    assert_eq!(result.report.dropped_lines, 6);
    assert_eq!(result.report.spans.len(), 1);
    assert!(result.report.spans[0].terminated);
    assert!(result.report.warnings.is_empty());
}

#[test]
fn test_mostly_called_token_is_function() {
    let mut script = String::new();
    for i in 0..8 {
        script.push_str(&format!("%kf@#%({i})\n"));
    }
    script.push_str("x := %kf@#%\n%kf@#%\n");

    let result = deobfuscate(&script, &Options::default()).unwrap();
    let entry = result.mapping.get("kf@#").unwrap();

    assert_eq!(entry.category, Category::FunctionCall);
    assert!(entry.name.starts_with("Function_"));
    assert!((entry.confidence - 0.8).abs() < f64::EPSILON);
    assert_eq!(entry.occurrences, 10);
}

#[test]
fn test_mouse_click_line_is_coordinate() {
    let options = Options::default();
    let script = "MouseClick, Left, 520, 150 ; %@k%\n%@k% := 0\n";

    let mut ctx = DeobfuscateContext::new(&options).unwrap();
    ctx.analyze(&Document::parse(script));
    let tally = &ctx.tokens()[0].tally;
    assert_eq!(tally.sampled, 2);
    assert_eq!(tally.votes(Category::Coordinate), 1);
    assert_eq!(tally.votes(Category::FunctionCall), 0);
    assert_eq!(tally.votes(Category::ControlLabel), 0);

    let entry = ctx.build_mapping().get("@k").cloned().unwrap();
    assert_eq!(entry.category, Category::Coordinate);
    assert_eq!(entry.name, "CoordVar_001");
}

#[test]
fn test_escaped_percent_stays_literal() {
    let result = deobfuscate("MsgBox, 100`% done %kf%\n", &Options::default()).unwrap();

    assert_eq!(result.output, "MsgBox, 100`% done Var_001\n");
    assert_eq!(result.mapping.len(), 1);
    assert!(result.mapping.get(" done ").is_none());
}

#[test]
fn test_unbalanced_span_warns_instead_of_failing() {
    let script = "%kf%(1)\nCheck_ForUpdate() {\n    if (%kf%) {\n        %kf%(2)\n";

    let result = deobfuscate(script, &Options::default()).unwrap();

    assert_eq!(result.output, "Function_001(1)\n");
    assert_eq!(result.report.warnings.len(), 1);
    assert!(!result.report.spans[0].terminated);
    assert_eq!(result.report.spans[0].end, 3);
}

#[test]
fn test_declarations_can_be_kept() {
    let script = "kf@#:\n%kf@#%()\n";
    let options = Options {
        drop_declarations: false,
        ..Options::default()
    };

    let result = deobfuscate(script, &options).unwrap();

    assert_eq!(result.output, "kf@#:\nFunction_001()\n");
    assert_eq!(result.report.declarations, 1);
}

#[test]
fn test_custom_alphabet_and_markers_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("options.json");
    std::fs::write(
        &path,
        r#"{ "alphabet": "xz", "min_literal_len": 4, "variable_marker": "$",
             "removal_keywords": ["phone_home"] }"#,
    )
    .unwrap();

    let options = Options::from_json_file(&path).unwrap();
    let result = deobfuscate(
        "$xz$(1)\nmsg := \"xzzx\"\nphone_home()\n$A_Index$\n",
        &options,
    )
    .unwrap();

    assert_eq!(result.output, "Function_001(1)\nmsg := \"StringVar_001\"\n$A_Index$\n");
}

#[test]
fn test_invalid_precedence_is_rejected() {
    let mut options = Options::default();
    options.precedence.clear();

    let err = deobfuscate("%kf%\n", &options).unwrap_err();

    assert!(matches!(err, DeobfuscateError::InvalidOption(_)));
}

#[test]
fn test_report_lists_every_token() {
    let script = "%zz%(1)\n%aa%\nHotkey, F2, %mm%\n";

    let result = deobfuscate(script, &Options::default()).unwrap();
    let text = result.report.to_text();

    let aa = text.find("; aa -> Var_001").unwrap();
    let mm = text.find("; mm -> HotkeyFunc_001").unwrap();
    let zz = text.find("; zz -> Function_001").unwrap();
    assert!(aa < mm && mm < zz);
}
