use loqum_rs::quality::{
    self, EXACT_T_MAX_DF, QualityTrend, decode_qualities, fit_values, students_t_two_sided,
};

fn close(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

#[test]
fn decodes_phred_plus_33() {
    let values: Vec<f64> = decode_qualities("!+5I").collect();
    assert_eq!(values, vec![0.0, 10.0, 20.0, 40.0]);
}

/// Constant qualities: no trend, correlation reported as 0 and the slope test
/// is not significant.
#[test]
fn constant_quality_has_zero_slope() {
    let trend = quality::fit("IIIIIIIIII");
    assert!(close(trend.slope, 0.0, 1e-12));
    assert!(close(trend.intercept, 40.0, 1e-12));
    assert_eq!(trend.r_value, 0.0);
    assert!(close(trend.p_value, 1.0, 1e-12));
    assert_eq!(trend.std_err, 0.0);
}

#[test]
fn increasing_quality_has_positive_slope() {
    // 0, 1, 2, 3, 4
    let trend = quality::fit("!\"#$%");
    assert!(close(trend.slope, 1.0, 1e-12));
    assert!(close(trend.intercept, 0.0, 1e-12));
    assert!(close(trend.r_value, 1.0, 1e-12));
    assert!(trend.p_value < 1e-6);
    assert!(close(trend.std_err, 0.0, 1e-9));

    let decreasing = quality::fit("IIHGF?5+");
    assert!(decreasing.slope < 0.0);
    assert!(decreasing.r_value < 0.0);
}

/// Reference values for x = 0..5, y = [1, 3, 2, 5, 4]:
/// slope 0.8, intercept 1.4, r 0.8, two-sided p 0.1040880, stderr sqrt(0.12).
#[test]
fn matches_closed_form_regression() {
    let trend = quality::fit("\"$#&%");
    assert!(close(trend.slope, 0.8, 1e-12));
    assert!(close(trend.intercept, 1.4, 1e-12));
    assert!(close(trend.r_value, 0.8, 1e-12));
    assert!(close(trend.p_value, 0.104_088_038_661_827_9, 1e-7), "p = {}", trend.p_value);
    assert!(close(trend.std_err, 0.12f64.sqrt(), 1e-12));
}

#[test]
fn two_points_give_exact_fit() {
    let trend = fit_values(&[10.0, 20.0]);
    assert!(close(trend.slope, 10.0, 1e-12));
    assert_eq!(trend.r_value, 1.0);
    assert_eq!(trend.p_value, 0.0);
    assert_eq!(trend.std_err, 0.0);

    let flat = fit_values(&[7.0, 7.0]);
    assert_eq!(flat.slope, 0.0);
    assert_eq!(flat.p_value, 1.0);
}

/// Fewer than two qualities cannot define a trend; a sentinel is reported
/// instead of failing the run.
#[test]
fn degenerate_input_reports_sentinel() {
    for qual in ["", "I"] {
        let trend = quality::fit(qual);
        assert!(!trend.is_defined());
        assert!(trend.slope.is_nan());
        assert!(trend.intercept.is_nan());
        assert!(trend.r_value.is_nan());
        assert!(trend.p_value.is_nan());
        assert_eq!(trend.std_err, 0.0);
    }
    assert!(quality::fit("II").is_defined());
    assert!(QualityTrend::UNDEFINED.slope.is_nan());
}

#[test]
fn students_t_tail_probabilities() {
    assert!(close(students_t_two_sided(0.0, 5.0), 1.0, 1e-12));
    // df = 1 is the Cauchy distribution: P(|T| >= 1) = 0.5.
    assert!(close(students_t_two_sided(1.0, 1.0), 0.5, 1e-10));
    // Symmetric in t.
    assert!(close(
        students_t_two_sided(-2.5, 7.0),
        students_t_two_sided(2.5, 7.0),
        1e-15
    ));
    // Tabulated 97.5% quantile for 30 degrees of freedom.
    assert!(close(students_t_two_sided(2.042_272, 30.0), 0.05, 1e-6));
    assert_eq!(students_t_two_sided(f64::INFINITY, 3.0), 0.0);
}

/// Long reads go past the exact range; the tail stays continuous and close to
/// the true t distribution there.
#[test]
fn students_t_tail_for_many_degrees_of_freedom() {
    // Reference tails from numerical integration of the t density.
    assert!(close(students_t_two_sided(1.96, 1000.0), 0.050_273_18, 1e-6));
    assert!(close(students_t_two_sided(0.5, 300.0), 0.617_441_62, 1e-6));
    assert!(close(students_t_two_sided(2.5, 200.0), 0.013_223_17, 1e-6));

    let below = students_t_two_sided(2.0, EXACT_T_MAX_DF);
    let above = students_t_two_sided(2.0, EXACT_T_MAX_DF + 1.0);
    assert!(close(below, above, 1e-4), "{below} vs {above}");

    let long_read = "I".repeat(600) + &"5".repeat(600);
    let trend = quality::fit(&long_read);
    assert!(trend.slope < 0.0);
    assert!(trend.p_value.is_finite());
    assert!(trend.p_value < 1e-6);
}
