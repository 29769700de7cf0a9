//! Dotted-name parameter access
//!
//! Hosts (the CLI, language bindings) address parameters by dotted names such
//! as `kc.N` or `pn.noise.sd`. Values travel as strings so one entry point
//! covers floats, counts, flags and index lists.

use std::fmt::Display;
use std::str::FromStr;

use crate::error::{ConfigError, ConfigResult};
use crate::params::ModelParams;

/// Every name understood by [`ModelParams::get_param`] and [`ModelParams::set_param`].
pub const PARAM_NAMES: &[&str] = &[
    "time.pre_start",
    "time.start",
    "time.end",
    "time.stim.start",
    "time.stim.end",
    "time.dt",
    "orn.taum",
    "orn.n_physical_gloms",
    "ln.taum",
    "ln.tauGA",
    "ln.tauGB",
    "ln.thr",
    "ln.inhsc",
    "ln.inhadd",
    "pn.taum",
    "pn.offset",
    "pn.tanhsc",
    "pn.inhsc",
    "pn.inhadd",
    "pn.noise.mean",
    "pn.noise.sd",
    "kc.N",
    "kc.nclaws",
    "kc.uniform_pns",
    "kc.cxn_distrib",
    "kc.enable_apl",
    "kc.fixed_thr",
    "kc.use_homeostatic_thrs",
    "kc.sp_target",
    "kc.sp_acc",
    "kc.sp_lr_coeff",
    "kc.max_iters",
    "kc.tune_from",
    "kc.taum",
    "kc.apl_taum",
    "kc.tau_apl2kc",
    "seed",
];

fn parse<T>(name: &str, raw: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
        name: name.to_string(),
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

/// `"none"` or an empty string clears an optional value.
fn parse_opt<T>(name: &str, raw: &str) -> ConfigResult<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        Ok(None)
    } else {
        parse(name, trimmed).map(Some)
    }
}

/// Comma-separated list, optionally wrapped in brackets.
fn parse_list<T>(name: &str, raw: &str) -> ConfigResult<Vec<T>>
where
    T: FromStr,
    T::Err: Display,
{
    let inner = raw.trim().trim_start_matches('[').trim_end_matches(']');
    inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse(name, s))
        .collect()
}

fn fmt_list<T: Display>(items: &[T]) -> String {
    let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join(","))
}

fn fmt_opt<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "none".to_string(), |v| v.to_string())
}

impl ModelParams {
    /// Read a parameter by dotted name.
    pub fn get_param(&self, name: &str) -> ConfigResult<String> {
        let value = match name {
            "time.pre_start" => self.time.pre_start.to_string(),
            "time.start" => self.time.start.to_string(),
            "time.end" => self.time.end.to_string(),
            "time.stim.start" => self.time.stim_start.to_string(),
            "time.stim.end" => self.time.stim_end.to_string(),
            "time.dt" => self.time.dt.to_string(),
            "orn.taum" => self.orn.taum.to_string(),
            "orn.n_physical_gloms" => self.orn.n_physical_gloms.to_string(),
            "ln.taum" => self.ln.taum.to_string(),
            "ln.tauGA" => self.ln.tau_ga.to_string(),
            "ln.tauGB" => self.ln.tau_gb.to_string(),
            "ln.thr" => self.ln.thr.to_string(),
            "ln.inhsc" => self.ln.inhsc.to_string(),
            "ln.inhadd" => self.ln.inhadd.to_string(),
            "pn.taum" => self.pn.taum.to_string(),
            "pn.offset" => self.pn.offset.to_string(),
            "pn.tanhsc" => self.pn.tanhsc.to_string(),
            "pn.inhsc" => self.pn.inhsc.to_string(),
            "pn.inhadd" => self.pn.inhadd.to_string(),
            "pn.noise.mean" => self.pn.noise.mean.to_string(),
            "pn.noise.sd" => self.pn.noise.sd.to_string(),
            "kc.N" => self.kc.n.to_string(),
            "kc.nclaws" => self.kc.nclaws.to_string(),
            "kc.uniform_pns" => self.kc.uniform_pns.to_string(),
            "kc.cxn_distrib" => fmt_list(&self.kc.cxn_distrib),
            "kc.enable_apl" => self.kc.enable_apl.to_string(),
            "kc.fixed_thr" => fmt_opt(self.kc.fixed_thr),
            "kc.use_homeostatic_thrs" => self.kc.use_homeostatic_thrs.to_string(),
            "kc.sp_target" => self.kc.sp_target.to_string(),
            "kc.sp_acc" => self.kc.sp_acc.to_string(),
            "kc.sp_lr_coeff" => self.kc.sp_lr_coeff.to_string(),
            "kc.max_iters" => self.kc.max_iters.to_string(),
            "kc.tune_from" => fmt_list(&self.kc.tune_from),
            "kc.taum" => self.kc.taum.to_string(),
            "kc.apl_taum" => self.kc.apl_taum.to_string(),
            "kc.tau_apl2kc" => self.kc.tau_apl2kc.to_string(),
            "seed" => fmt_opt(self.seed),
            _ => {
                return Err(ConfigError::UnknownParameter {
                    name: name.to_string(),
                })
            }
        };
        Ok(value)
    }

    /// Overwrite a parameter by dotted name.
    ///
    /// Nothing is modified when the name is unknown or the value fails to
    /// parse. Cross-field invariants are checked later by [`ModelParams::validate`].
    pub fn set_param(&mut self, name: &str, raw: &str) -> ConfigResult<()> {
        match name {
            "time.pre_start" => self.time.pre_start = parse(name, raw)?,
            "time.start" => self.time.start = parse(name, raw)?,
            "time.end" => self.time.end = parse(name, raw)?,
            "time.stim.start" => self.time.stim_start = parse(name, raw)?,
            "time.stim.end" => self.time.stim_end = parse(name, raw)?,
            "time.dt" => self.time.dt = parse(name, raw)?,
            "orn.taum" => self.orn.taum = parse(name, raw)?,
            "orn.n_physical_gloms" => self.orn.n_physical_gloms = parse(name, raw)?,
            "ln.taum" => self.ln.taum = parse(name, raw)?,
            "ln.tauGA" => self.ln.tau_ga = parse(name, raw)?,
            "ln.tauGB" => self.ln.tau_gb = parse(name, raw)?,
            "ln.thr" => self.ln.thr = parse(name, raw)?,
            "ln.inhsc" => self.ln.inhsc = parse(name, raw)?,
            "ln.inhadd" => self.ln.inhadd = parse(name, raw)?,
            "pn.taum" => self.pn.taum = parse(name, raw)?,
            "pn.offset" => self.pn.offset = parse(name, raw)?,
            "pn.tanhsc" => self.pn.tanhsc = parse(name, raw)?,
            "pn.inhsc" => self.pn.inhsc = parse(name, raw)?,
            "pn.inhadd" => self.pn.inhadd = parse(name, raw)?,
            "pn.noise.mean" => self.pn.noise.mean = parse(name, raw)?,
            "pn.noise.sd" => self.pn.noise.sd = parse(name, raw)?,
            "kc.N" => self.kc.n = parse(name, raw)?,
            "kc.nclaws" => self.kc.nclaws = parse(name, raw)?,
            "kc.uniform_pns" => self.kc.uniform_pns = parse(name, raw)?,
            "kc.cxn_distrib" => self.kc.cxn_distrib = parse_list(name, raw)?,
            "kc.enable_apl" => self.kc.enable_apl = parse(name, raw)?,
            "kc.fixed_thr" => self.kc.fixed_thr = parse_opt(name, raw)?,
            "kc.use_homeostatic_thrs" => self.kc.use_homeostatic_thrs = parse(name, raw)?,
            "kc.sp_target" => self.kc.sp_target = parse(name, raw)?,
            "kc.sp_acc" => self.kc.sp_acc = parse(name, raw)?,
            "kc.sp_lr_coeff" => self.kc.sp_lr_coeff = parse(name, raw)?,
            "kc.max_iters" => self.kc.max_iters = parse(name, raw)?,
            "kc.tune_from" => self.kc.tune_from = parse_list(name, raw)?,
            "kc.taum" => self.kc.taum = parse(name, raw)?,
            "kc.apl_taum" => self.kc.apl_taum = parse(name, raw)?,
            "kc.tau_apl2kc" => self.kc.tau_apl2kc = parse(name, raw)?,
            "seed" => self.seed = parse_opt(name, raw)?,
            _ => {
                return Err(ConfigError::UnknownParameter {
                    name: name.to_string(),
                })
            }
        }
        Ok(())
    }

    /// Apply a `name=value` override, as given on a command line.
    pub fn apply_override(&mut self, assignment: &str) -> ConfigResult<()> {
        let Some((name, raw)) = assignment.split_once('=') else {
            return Err(ConfigError::InvalidValue {
                name: assignment.to_string(),
                value: String::new(),
                reason: "expected name=value".into(),
            });
        };
        self.set_param(name.trim(), raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_listed_name_is_readable_and_writable() {
        let mut p = ModelParams::default();
        for name in PARAM_NAMES {
            let value = p.get_param(name).unwrap();
            p.set_param(name, &value).unwrap();
        }
        assert_eq!(p, ModelParams::default());
    }

    #[test]
    fn test_set_and_get_typed_values() {
        let mut p = ModelParams::default();
        p.set_param("kc.N", "150").unwrap();
        p.set_param("kc.fixed_thr", "2.5").unwrap();
        p.set_param("kc.tune_from", "[0, 2,4]").unwrap();
        p.set_param("time.stim.end", "0.25").unwrap();

        assert_eq!(p.kc.n, 150);
        assert_eq!(p.kc.fixed_thr, Some(2.5));
        assert_eq!(p.kc.tune_from, vec![0, 2, 4]);
        assert!((p.time.stim_end - 0.25).abs() < 1e-12);
        assert_eq!(p.get_param("kc.tune_from").unwrap(), "[0,2,4]");

        p.set_param("kc.fixed_thr", "none").unwrap();
        assert_eq!(p.kc.fixed_thr, None);
    }

    #[test]
    fn test_unknown_name_rejected() {
        let mut p = ModelParams::default();
        assert!(matches!(
            p.set_param("kc.bogus", "1"),
            Err(ConfigError::UnknownParameter { .. })
        ));
        assert!(matches!(
            p.get_param("orn.hcdata_path"),
            Err(ConfigError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn test_bad_value_leaves_params_untouched() {
        let mut p = ModelParams::default();
        let err = p.set_param("kc.N", "many").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert_eq!(p.kc.n, 2000);
    }

    #[test]
    fn test_apply_override() {
        let mut p = ModelParams::default();
        p.apply_override("kc.enable_apl=false").unwrap();
        assert!(!p.kc.enable_apl);
        assert!(p.apply_override("kc.enable_apl").is_err());
    }
}
