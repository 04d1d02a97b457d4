use approx::assert_relative_eq;
use ode_engine::{
    Algorithm, Code, IntegrationConfig, IntegrationContext, IntegrationSession, Method, Op,
    PrintRequest, PrintSpec, Recorder, RowPrinter, Selector, VarId,
};

const STEP_SIZE: f64 = 0.01;

// dy/dt = y, y(0) = 1
fn growth(ctx: &mut IntegrationContext) -> VarId {
    let y = ctx.table.intern("y");
    ctx.table[y].set_equation(Code::new(vec![Op::Load(y)]));
    ctx.table[y].set_value(1.0);
    y
}

fn fixed(algorithm: Algorithm) -> IntegrationConfig {
    IntegrationConfig {
        algorithm,
        fixed_step: true,
        ..IntegrationConfig::default()
    }
}

fn final_value(algorithm: Algorithm, step: f64) -> f64 {
    let mut ctx = IntegrationContext::new();
    let y = growth(&mut ctx);
    let mut recorder = Recorder::new();
    IntegrationSession::new(&fixed(algorithm), &ctx.print, 0.0, 1.0, Some(step))
        .run(&mut ctx, &mut recorder)
        .unwrap();
    ctx.table[y].value
}

#[test]
fn test_euler_first_order() {
    let coarse = final_value(Algorithm::Euler, STEP_SIZE);
    assert_relative_eq!(coarse, 1.01f64.powi(100), epsilon = 1e-9);
    assert_relative_eq!(coarse, 2.7048, epsilon = 1e-4);

    let fine = final_value(Algorithm::Euler, STEP_SIZE / 2.0);
    let ratio = (1f64.exp() - coarse) / (1f64.exp() - fine);
    assert!(ratio > 1.9 && ratio < 2.1, "ratio = {}", ratio);
}

#[test]
fn test_higher_order_methods_are_more_accurate() {
    let exact = 1f64.exp();
    let euler = (final_value(Algorithm::Euler, 0.1) - exact).abs();
    let rk4 = (final_value(Algorithm::RungeKuttaFehlberg, 0.1) - exact).abs();
    let am4 = (final_value(Algorithm::AdamsMoulton, 0.1) - exact).abs();
    assert!(rk4 < 1e-5);
    assert!(am4 < 1e-4);
    assert!(rk4 < euler && am4 < euler);
}

#[test]
fn test_adams_moulton_short_range_uses_startup_only() {
    let mut ctx = IntegrationContext::new();
    growth(&mut ctx);
    let mut recorder = Recorder::new();
    let session =
        IntegrationSession::new(&fixed(Algorithm::AdamsMoulton), &ctx.print, 0.0, 0.2, Some(0.1));
    assert_eq!(session.method, Method::AdamsMoulton);

    let stats = session.run(&mut ctx, &mut recorder).unwrap();
    assert_eq!(stats.accepted_steps, 2);
    assert_eq!(stats.startup_steps, 2);
    assert_eq!(recorder.rows.len(), 3);
}

#[test]
fn test_empty_span_emits_single_row() {
    for algorithm in [
        Algorithm::Euler,
        Algorithm::RungeKuttaFehlberg,
        Algorithm::AdamsMoulton,
    ] {
        for fixed_step in [true, false] {
            let config = IntegrationConfig {
                algorithm,
                fixed_step,
                ..IntegrationConfig::default()
            };
            let mut ctx = IntegrationContext::new();
            growth(&mut ctx);
            let mut recorder = Recorder::new();
            let stats = IntegrationSession::new(&config, &ctx.print, 3.0, 3.0, None)
                .run(&mut ctx, &mut recorder)
                .unwrap();
            assert_eq!(stats.accepted_steps, 0, "{:?}", algorithm);
            assert_eq!(recorder.rows, vec![vec![3.0, 1.0]], "{:?}", algorithm);
        }
    }
}

#[test]
fn test_stride_and_offset() {
    let mut ctx = IntegrationContext::new();
    let t = ctx.table.intern("t");
    let y = growth(&mut ctx);
    let columns = vec![
        PrintRequest {
            var: t,
            selector: Selector::Value,
        },
        PrintRequest {
            var: y,
            selector: Selector::Value,
        },
    ];

    ctx.print = PrintSpec::new(columns.clone()).every(3);
    let mut recorder = Recorder::new();
    IntegrationSession::new(&fixed(Algorithm::Euler), &ctx.print, 0.0, 1.0, Some(0.1))
        .run(&mut ctx, &mut recorder)
        .unwrap();
    // Steps 0, 3, 6 and 9, then the final row.
    assert_eq!(recorder.rows.len(), 5);
    assert_relative_eq!(recorder.rows[1][0], 0.3, epsilon = 1e-12);
    assert_relative_eq!(recorder.last().unwrap()[0], 1.0, epsilon = 1e-12);

    ctx.table[y].set_value(1.0);
    ctx.print = PrintSpec::new(columns).every(3).starting_at(0.5);
    let mut recorder = Recorder::new();
    IntegrationSession::new(&fixed(Algorithm::Euler), &ctx.print, 0.0, 1.0, Some(0.1))
        .run(&mut ctx, &mut recorder)
        .unwrap();
    assert_eq!(recorder.rows.len(), 3);
    assert_relative_eq!(recorder.rows[0][0], 0.6, epsilon = 1e-12);
}

#[test]
fn test_error_columns_report_estimates() {
    let mut ctx = IntegrationContext::new();
    let t = ctx.table.intern("t");
    let y = growth(&mut ctx);
    ctx.print = PrintSpec::new(vec![
        PrintRequest {
            var: t,
            selector: Selector::Value,
        },
        PrintRequest {
            var: y,
            selector: Selector::AbsoluteError,
        },
        PrintRequest {
            var: y,
            selector: Selector::AccumulatedError,
        },
    ]);
    let session = IntegrationSession::new(
        &fixed(Algorithm::RungeKuttaFehlberg),
        &ctx.print,
        0.0,
        1.0,
        Some(0.1),
    );
    assert_eq!(session.method, Method::Rkf45 { controlled: false });

    let mut recorder = Recorder::new();
    let stats = session.run(&mut ctx, &mut recorder).unwrap();
    assert_eq!(stats.rejected_steps, 0);
    assert_eq!(recorder.rows[0][1], 0.0);
    for row in &recorder.rows[1..] {
        assert!(row[1] > 0.0);
        assert!(row[2] >= row[1]);
    }
    let last = recorder.last().unwrap();
    assert!(last[2] > recorder.rows[1][2]);
}

#[test]
fn test_row_printer() {
    let mut ctx = IntegrationContext::new();
    let t = ctx.table.intern("t");
    let x = ctx.table.intern("x");
    ctx.table[x].set_equation(Code::constant(2.0));
    ctx.table[x].set_value(0.0);
    ctx.print = PrintSpec::new(vec![
        PrintRequest {
            var: t,
            selector: Selector::Value,
        },
        PrintRequest {
            var: x,
            selector: Selector::Value,
        },
        PrintRequest {
            var: x,
            selector: Selector::Derivative,
        },
    ]);

    let mut printer = RowPrinter::new(Vec::new(), 6, false);
    IntegrationSession::new(&fixed(Algorithm::Euler), &ctx.print, 0.0, 1.0, Some(0.5))
        .run(&mut ctx, &mut printer)
        .unwrap();

    let text = String::from_utf8(printer.into_inner()).unwrap();
    assert_eq!(text, "0 0 2\n0.5 1 2\n1 2 2\n");
}
