//! CPLEX LP-format rendering of a [`LinearModel`].

use super::linear::{LinearModel, ObjectiveSense, VarKind};

fn push_term(out: &mut String, first: &mut bool, coef: f64, name: &str) {
    if *first {
        if coef < 0.0 {
            out.push_str("- ");
        }
        *first = false;
    } else if coef < 0.0 {
        out.push_str(" - ");
    } else {
        out.push_str(" + ");
    }
    let mag = coef.abs();
    if mag == 1.0 {
        out.push_str(name);
    } else {
        out.push_str(&format!("{} {}", mag, name));
    }
}

fn fmt_bound(v: f64) -> String {
    if v == f64::INFINITY {
        "+inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        format!("{}", v)
    }
}

/// Render `model` as LP text.
pub fn to_lp_string(model: &LinearModel) -> String {
    let mut out = String::new();
    let vars = model.variables();

    out.push_str(&format!("\\ Model {}\n", model.name()));
    out.push_str(match model.sense() {
        ObjectiveSense::Minimize => "Minimize\n",
        ObjectiveSense::Maximize => "Maximize\n",
    });

    out.push_str(" obj: ");
    let mut first = true;
    for (v, c) in model.objective().terms() {
        if c != 0.0 {
            push_term(&mut out, &mut first, c, &vars[v.index()].name);
        }
    }
    let offset = model.objective().constant_value();
    if first {
        out.push_str(&offset.to_string());
    } else if offset != 0.0 {
        let sign = if offset < 0.0 { '-' } else { '+' };
        out.push_str(&format!(" {} {}", sign, offset.abs()));
    }
    out.push('\n');

    out.push_str("Subject To\n");
    for c in model.constraints() {
        out.push_str(&format!(" {}: ", c.name));
        let mut first = true;
        for (j, a) in c.row.iter() {
            push_term(&mut out, &mut first, *a, &vars[j].name);
        }
        if first {
            out.push('0');
        }
        out.push_str(&format!(" {} {}\n", c.sense, c.rhs));
    }

    out.push_str("Bounds\n");
    for v in vars.iter().filter(|v| v.kind != VarKind::Binary) {
        out.push_str(&format!(
            " {} <= {} <= {}\n",
            fmt_bound(v.lower),
            v.name,
            fmt_bound(v.upper)
        ));
    }

    let binaries: Vec<&str> = vars
        .iter()
        .filter(|v| v.kind == VarKind::Binary)
        .map(|v| v.name.as_str())
        .collect();
    if !binaries.is_empty() {
        out.push_str("Binaries\n");
        out.push_str(&format!(" {}\n", binaries.join(" ")));
    }

    let generals: Vec<&str> = vars
        .iter()
        .filter(|v| v.kind == VarKind::Integer)
        .map(|v| v.name.as_str())
        .collect();
    if !generals.is_empty() {
        out.push_str("Generals\n");
        out.push_str(&format!(" {}\n", generals.join(" ")));
    }

    out.push_str("End\n");
    out
}
