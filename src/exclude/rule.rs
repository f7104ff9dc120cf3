use std::collections::BTreeSet;

use crate::config::model::ExcludeConfig;
use crate::errors::{Result, RundagError};
use crate::exclude::flags::FeatureFlags;
use crate::types::Action;

/// Actions an exclude block applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionScope {
    All,
    /// Everything but `output`, so dependents can still read outputs.
    AllExceptOutput,
    Only(BTreeSet<Action>),
}

impl ActionScope {
    pub fn parse(names: &[String]) -> Result<Self> {
        let mut only = BTreeSet::new();

        for name in names {
            match name.trim().to_lowercase().as_str() {
                "all" => return Ok(ActionScope::All),
                "all_except_output" => return Ok(ActionScope::AllExceptOutput),
                other => {
                    let action = other.parse::<Action>().map_err(RundagError::ConfigError)?;
                    only.insert(action);
                }
            }
        }

        Ok(ActionScope::Only(only))
    }

    pub fn covers(&self, action: Action) -> bool {
        match self {
            ActionScope::All => true,
            ActionScope::AllExceptOutput => action != Action::Output,
            ActionScope::Only(set) => set.contains(&action),
        }
    }
}

/// Compiled `exclude` block of a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludeRule {
    pub condition: bool,
    pub if_flag: Option<String>,
    pub actions: ActionScope,
    pub no_run: bool,
    pub exclude_dependents: bool,
}

impl ExcludeRule {
    /// A rule excluding the unit for the given actions.
    pub fn for_actions(actions: &[Action]) -> Self {
        Self {
            condition: true,
            if_flag: None,
            actions: ActionScope::Only(actions.iter().copied().collect()),
            no_run: false,
            exclude_dependents: false,
        }
    }

    /// A rule that keeps the unit from ever running.
    pub fn no_run() -> Self {
        Self {
            condition: true,
            if_flag: None,
            actions: ActionScope::Only(BTreeSet::new()),
            no_run: true,
            exclude_dependents: false,
        }
    }

    pub fn when_flag(mut self, flag: &str) -> Self {
        self.if_flag = Some(flag.to_string());
        self
    }

    pub fn with_condition(mut self, condition: bool) -> Self {
        self.condition = condition;
        self
    }

    pub fn cascading(mut self) -> Self {
        self.exclude_dependents = true;
        self
    }

    pub fn from_config(cfg: &ExcludeConfig) -> Result<Self> {
        Ok(Self {
            condition: cfg.condition,
            if_flag: cfg.if_flag.clone(),
            actions: ActionScope::parse(&cfg.actions)?,
            no_run: cfg.no_run,
            exclude_dependents: cfg.exclude_dependents,
        })
    }

    /// Whether the block is switched on at all.
    pub fn is_active(&self, flags: &dyn FeatureFlags) -> bool {
        if !self.condition {
            return false;
        }
        match &self.if_flag {
            Some(flag) => flags.is_enabled(flag),
            None => true,
        }
    }

    pub fn blocks_all_runs(&self, flags: &dyn FeatureFlags) -> bool {
        self.no_run && self.is_active(flags)
    }

    pub fn blocks_action(&self, action: Action, flags: &dyn FeatureFlags) -> bool {
        self.actions.covers(action) && self.is_active(flags)
    }
}
