use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use interpreter::combinator::{map_each, pipe};
use interpreter::{
    ArgumentDecoding, CommandError, CommandRegistry, Context, RuntimeError, RuntimeValue,
    ScriptError, Step, StepRef, step_fn,
};

fn builtins() -> CommandRegistry {
    CommandRegistry::with_builtins()
}

async fn run(source: &str, input: RuntimeValue) -> RuntimeValue {
    interpreter::run_script(source, &builtins(), input)
        .await
        .expect("script failed")
}

fn strings(items: &[&str]) -> RuntimeValue {
    RuntimeValue::List(items.iter().map(|s| RuntimeValue::from(*s)).collect())
}

async fn call(step: &StepRef, input: RuntimeValue) -> Result<RuntimeValue, RuntimeError> {
    let mut ctx = Context::new();
    step.call(&mut ctx, input).await
}

/// Doubles a numeric string after a delay that shrinks with the value, so
/// larger inputs finish first.
struct SlowDouble;

#[async_trait]
impl Step for SlowDouble {
    async fn call(
        &self,
        _ctx: &mut Context,
        input: RuntimeValue,
    ) -> Result<RuntimeValue, RuntimeError> {
        let n: u64 = input
            .as_str()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| RuntimeError::Custom("not a number".into()))?;
        tokio::time::sleep(Duration::from_millis((6 - n.min(5)) * 10)).await;
        Ok(RuntimeValue::String((n * 2).to_string()))
    }
}

// ---------------------------------------------------------------------------
// End-to-end scripts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn echo_script() {
    assert_eq!(run("echo hi", RuntimeValue::Unit).await, RuntimeValue::from("hi"));
}

#[tokio::test]
async fn nested_block_maps_with_a_context_per_element() {
    let result = run("split\n  save line", "a\nb".into()).await;
    assert_eq!(
        result,
        RuntimeValue::List(vec![
            RuntimeValue::map([("line", "a")]),
            RuntimeValue::map([("line", "b")]),
        ])
    );
}

#[tokio::test]
async fn deeply_nested_blocks_map_at_every_level() {
    let result = run("split ;\n  split ,\n    trim", "a, b;c".into()).await;
    assert_eq!(
        result,
        RuntimeValue::List(vec![strings(&["a", "b"]), strings(&["c"])])
    );
}

#[tokio::test]
async fn branch_contexts_do_not_leak_into_the_parent() {
    let source = "echo a,b\nsave all\nsplit ,\n  save item";
    let result = run(source, RuntimeValue::Unit).await;
    assert_eq!(result, RuntimeValue::map([("all", "a,b")]));
}

#[tokio::test]
async fn comments_never_run() {
    let source = "# inventory\necho hi\n# trailing note";
    assert_eq!(run(source, RuntimeValue::Unit).await, RuntimeValue::from("hi"));
}

#[tokio::test]
async fn indented_comment_forms_an_empty_mapped_block() {
    // The comment still opens a sub-block, which maps over the list unchanged.
    let result = run("split ,\n  # nothing to do\njoin -", "x,y".into()).await;
    assert_eq!(result, RuntimeValue::from("x-y"));
}

#[tokio::test]
async fn empty_script_returns_its_input() {
    assert_eq!(run("", "same".into()).await, RuntimeValue::from("same"));
    assert_eq!(run("# only a comment", "same".into()).await, RuntimeValue::from("same"));
}

#[tokio::test]
async fn saving_in_a_branch_returns_the_branch_context() {
    let source = "split\n  extract (?P<name>\\w+) (?P<version>\\S+)\n  save pkg\n  template {name}";
    let result = run(source, "vim 9.1\ngit 2.43".into()).await;
    // Each branch saved `pkg`, so each branch returns its context.
    let RuntimeValue::List(branches) = result else {
        panic!("expected a list");
    };
    assert_eq!(branches.len(), 2);
    assert_eq!(
        branches[0],
        RuntimeValue::map([(
            "pkg",
            RuntimeValue::map([("name", "vim"), ("version", "9.1")])
        )])
    );
}

#[tokio::test]
async fn template_without_saved_values_returns_text() {
    let result = run("split\n  template item: {.}", "a\nb".into()).await;
    assert_eq!(result, strings(&["item: a", "item: b"]));
}

// ---------------------------------------------------------------------------
// Argument decoding
// ---------------------------------------------------------------------------

#[tokio::test]
async fn escaped_arguments_are_decoded() {
    let result = run(r"echo a\tb", RuntimeValue::Unit).await;
    assert_eq!(result, RuntimeValue::from("a\tb"));
}

#[tokio::test]
async fn malformed_escapes_fall_back_to_raw_text() {
    let result = run(r"echo \d+", RuntimeValue::Unit).await;
    assert_eq!(result, RuntimeValue::from(r"\d+"));
}

#[tokio::test]
async fn extract_receives_its_pattern_raw() {
    // Unescaped, `\\` would become a lone backslash and an invalid pattern.
    let result = run(r"extract x\\y", r"x\y".into()).await;
    assert_eq!(result, RuntimeValue::from(r"x\y"));
}

#[tokio::test]
async fn arguments_are_rejoined_with_single_spaces() {
    let result = run("echo   one    two\tthree", RuntimeValue::Unit).await;
    assert_eq!(result, RuntimeValue::from("one two three"));
}

#[tokio::test]
async fn decoding_policy_is_per_command() {
    let mut registry = CommandRegistry::new();
    for (name, decoding) in [("raw", ArgumentDecoding::Raw), ("cooked", ArgumentDecoding::Escaped)] {
        registry.register(name, decoding, |argument: Option<String>| {
            Ok(step_fn(move |_ctx, _input| {
                Ok(argument.clone().map(RuntimeValue::from).into())
            }))
        });
    }

    let raw = interpreter::run_script(r"raw a\nb", &registry, RuntimeValue::Unit).await.unwrap();
    let cooked = interpreter::run_script(r"cooked a\nb", &registry, RuntimeValue::Unit).await.unwrap();
    assert_eq!(raw, RuntimeValue::from(r"a\nb"));
    assert_eq!(cooked, RuntimeValue::from("a\nb"));
}

// ---------------------------------------------------------------------------
// Compile errors
// ---------------------------------------------------------------------------

#[test]
fn unknown_command_is_a_compile_error() {
    let source = "echo a\nbogus-command foo\necho b";
    let Err(ScriptError::Compile(errors)) = interpreter::compile(source, &builtins()) else {
        panic!("expected a compile error");
    };
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("bogus-command"));
    assert_eq!(&source[errors[0].span.clone()], "bogus-command");
}

#[test]
fn every_unknown_command_is_reported() {
    let source = "nope\nsplit\n  missing x\n  # fine\n  trim";
    let Err(ScriptError::Compile(errors)) = interpreter::compile(source, &builtins()) else {
        panic!("expected a compile error");
    };
    let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, ["unknown command 'nope'", "unknown command 'missing'"]);
}

#[test]
fn factory_rejection_is_a_compile_error() {
    let Err(ScriptError::Compile(errors)) = interpreter::compile("save", &builtins()) else {
        panic!("expected a compile error");
    };
    assert_eq!(errors[0].message, "'save' requires an argument");

    let Err(ScriptError::Compile(errors)) = interpreter::compile("extract ([a-z]", &builtins())
    else {
        panic!("expected a compile error");
    };
    assert!(errors[0].message.starts_with("invalid argument for 'extract'"));
}

#[test]
fn dedent_below_the_first_line_is_a_parse_error() {
    let result = interpreter::compile("  echo a\necho b", &builtins());
    assert!(matches!(result, Err(ScriptError::Parse(_))));
}

#[test]
fn compile_errors_carry_diagnostics() {
    let Err(err) = interpreter::compile("bogus", &builtins()) else {
        panic!("expected a compile error");
    };
    let diagnostics = err.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].message, "unknown command 'bogus'");
}

// ---------------------------------------------------------------------------
// Pipe and map semantics
// ---------------------------------------------------------------------------

fn log_step(name: &'static str) -> StepRef {
    step_fn(move |ctx, input| {
        let mut log = match ctx.remove("log") {
            Some(RuntimeValue::List(items)) => items,
            _ => Vec::new(),
        };
        log.push(name.into());
        ctx.insert("log", RuntimeValue::List(log));
        Ok(input)
    })
}

#[tokio::test]
async fn pipe_runs_steps_in_order_every_time() {
    let step = pipe(vec![log_step("s1"), log_step("s2"), log_step("s3")]);
    for _ in 0..20 {
        let result = call(&step, RuntimeValue::Unit).await.unwrap();
        assert_eq!(result, RuntimeValue::map([("log", strings(&["s1", "s2", "s3"]))]));
    }
}

#[tokio::test]
async fn pipe_feeds_each_output_to_the_next_step() {
    let append = |suffix: &'static str| {
        step_fn(move |_ctx, input| {
            let text = input.as_str().unwrap_or_default().to_string();
            Ok(RuntimeValue::String(text + suffix))
        })
    };
    let step = pipe(vec![append("a"), append("b"), append("c")]);
    assert_eq!(call(&step, ">".into()).await.unwrap(), RuntimeValue::from(">abc"));
}

#[tokio::test]
async fn context_takes_precedence_over_the_last_value() {
    let returns_x = step_fn(|_ctx, _input| Ok("X".into()));
    let saves_y = step_fn(|ctx, input| {
        ctx.insert("y", "saved".into());
        Ok(input)
    });
    let step = pipe(vec![returns_x.clone(), saves_y]);
    assert_eq!(
        call(&step, RuntimeValue::Unit).await.unwrap(),
        RuntimeValue::map([("y", "saved")])
    );

    let plain = pipe(vec![returns_x]);
    assert_eq!(call(&plain, RuntimeValue::Unit).await.unwrap(), RuntimeValue::from("X"));
}

#[tokio::test]
async fn pipe_ignores_the_callers_context() {
    let step = pipe(vec![step_fn(|ctx, _input| Ok(ctx.len().to_string().into()))]);
    let mut outer = Context::new();
    outer.insert("outer", "value".into());
    let result = step.call(&mut outer, RuntimeValue::Unit).await.unwrap();
    assert_eq!(result, RuntimeValue::from("0"));
}

#[tokio::test]
async fn pipe_stops_at_the_first_failure() {
    let ran_last = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran_last);
    let step = pipe(vec![
        log_step("s1"),
        step_fn(|_ctx, _input| Err(RuntimeError::Custom("s2 failed".into()))),
        step_fn(move |_ctx, input| {
            flag.store(true, Ordering::SeqCst);
            Ok(input)
        }),
    ]);

    let err = call(&step, RuntimeValue::Unit).await.unwrap_err();
    assert_eq!(err, RuntimeError::Custom("s2 failed".into()));
    assert!(!ran_last.load(Ordering::SeqCst));
}

#[tokio::test]
async fn map_preserves_input_order() {
    let step = map_each(pipe(vec![Arc::new(SlowDouble) as StepRef]));
    for _ in 0..3 {
        let result = call(&step, strings(&["1", "2", "3", "4", "5"])).await.unwrap();
        assert_eq!(result, strings(&["2", "4", "6", "8", "10"]));
    }
}

#[tokio::test(start_paused = true)]
async fn map_runs_branches_concurrently() {
    let step = map_each(Arc::new(SlowDouble));
    let started = tokio::time::Instant::now();
    call(&step, strings(&["1", "1", "1", "1", "1"])).await.unwrap();
    // Five sequential 50ms sleeps would take 250ms of clock time.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed < Duration::from_millis(100));
}

#[tokio::test]
async fn map_in_a_script_preserves_order() {
    let mut registry = builtins();
    registry.register("double", ArgumentDecoding::Escaped, |_arg: Option<String>| {
        Ok(Arc::new(SlowDouble) as StepRef)
    });
    let result = interpreter::run_script("split ,\n  double", &registry, "1,2,3,4,5".into())
        .await
        .unwrap();
    assert_eq!(result, strings(&["2", "4", "6", "8", "10"]));
}

#[tokio::test]
async fn map_fails_with_the_branch_error() {
    let step = map_each(step_fn(|_ctx, input| match input.as_str() {
        Some("3") => Err(RuntimeError::Custom("branch 3 failed".into())),
        _ => Ok(input),
    }));
    let err = call(&step, strings(&["1", "2", "3", "4", "5"])).await.unwrap_err();
    assert_eq!(err, RuntimeError::Custom("branch 3 failed".into()));
}

#[tokio::test]
async fn map_rejects_non_list_input() {
    let err = interpreter::run_script("echo hi\n  trim", &builtins(), RuntimeValue::Unit)
        .await
        .unwrap_err();
    match err {
        ScriptError::Runtime(RuntimeError::ExpectedList { got }) => assert_eq!(got, "String"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn map_over_an_empty_list() {
    let step = map_each(log_step("never"));
    assert_eq!(
        call(&step, RuntimeValue::List(Vec::new())).await.unwrap(),
        RuntimeValue::List(Vec::new())
    );
}

#[tokio::test]
async fn runtime_errors_pass_through_unmodified() {
    let err = interpreter::run_script("split", &builtins(), strings(&["a"]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ScriptError::Runtime(RuntimeError::TypeError { ref command, .. }) if command == "split"
    ));
}

#[tokio::test]
async fn compiled_pipelines_are_reusable() {
    let pipeline = interpreter::compile("split ,\n  save v", &builtins()).unwrap();
    let first = pipeline.run("a".into()).await.unwrap();
    let second = interpreter::run(&pipeline, "b,c".into()).await.unwrap();
    assert_eq!(first, RuntimeValue::List(vec![RuntimeValue::map([("v", "a")])]));
    assert_eq!(
        second,
        RuntimeValue::List(vec![
            RuntimeValue::map([("v", "b")]),
            RuntimeValue::map([("v", "c")]),
        ])
    );
}

#[test]
fn factories_may_reject_at_registration_time() {
    let mut registry = CommandRegistry::new();
    registry.register("strict", ArgumentDecoding::Escaped, |arg: Option<String>| match arg {
        Some(_) => Err(CommandError::InvalidArgument {
            command: "strict".into(),
            message: "takes no argument".into(),
        }),
        None => Ok(step_fn(|_ctx, input| Ok(input))),
    });
    assert!(interpreter::compile("strict", &registry).is_ok());
    assert!(interpreter::compile("strict x", &registry).is_err());
}
