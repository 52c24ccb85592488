//! Broker topology - exchange declarations and name derivation.
//!
//! The topology is configured once at startup and immutable afterwards. It
//! owns the two naming decisions the bus makes on every publish: which
//! exchange a message goes to and under which routing key, with configured
//! resolver functions taking precedence over the deterministic defaults.

use std::error::Error;
use std::fmt;

/// How an exchange routes messages to bound queues.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExchangeKind {
    Topic,
    Direct,
    Fanout,
}

/// Declaration of a broker exchange.
///
/// Exchanges must be declared consistently: redeclaring the same name with
/// identical parameters is a no-op, redeclaring with different parameters is
/// a configuration error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExchangeConfig {
    pub name: String,
    pub kind: ExchangeKind,
    pub durable: bool,
    pub auto_delete: bool,
}

impl ExchangeConfig {
    /// Create a durable, non-auto-delete exchange of the given kind.
    pub fn new(name: impl Into<String>, kind: ExchangeKind) -> Self {
        ExchangeConfig {
            name: name.into(),
            kind,
            durable: true,
            auto_delete: false,
        }
    }

    pub fn topic(name: impl Into<String>) -> Self {
        Self::new(name, ExchangeKind::Topic)
    }

    pub fn direct(name: impl Into<String>) -> Self {
        Self::new(name, ExchangeKind::Direct)
    }

    pub fn fanout(name: impl Into<String>) -> Self {
        Self::new(name, ExchangeKind::Fanout)
    }

    pub fn with_durable(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    pub fn with_auto_delete(mut self, auto_delete: bool) -> Self {
        self.auto_delete = auto_delete;
        self
    }
}

/// Error type for topology configuration and name resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TopologyError {
    /// An exchange was redeclared with conflicting parameters.
    Conflict { name: String },
    /// No resolver and no unambiguous default exchange exists for the type.
    NoExchangeConfigured { type_name: String },
    /// An operation referenced an exchange that was never declared.
    UnknownExchange { name: String },
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyError::Conflict { name } => {
                write!(f, "exchange {} redeclared with conflicting parameters", name)
            }
            TopologyError::NoExchangeConfigured { type_name } => {
                write!(f, "no exchange configured to route event type {}", type_name)
            }
            TopologyError::UnknownExchange { name } => {
                write!(f, "unknown exchange: {}", name)
            }
        }
    }
}

impl Error for TopologyError {}

type NameResolver = Box<dyn Fn(&str) -> String + Send + Sync>;

/// Default routing key for an event type name: the lower-cased name with a
/// trailing `Event` suffix stripped. `OrderPlacedEvent` becomes `orderplaced`.
pub fn default_routing_key(event_type_name: &str) -> String {
    event_type_name
        .strip_suffix("Event")
        .filter(|stripped| !stripped.is_empty())
        .unwrap_or(event_type_name)
        .to_lowercase()
}

/// Queue name for an (event type, handler) subscription.
///
/// Pure and stable across restarts - a restarted consumer derives the same
/// name and rejoins its durable queue instead of creating a diverging one.
pub fn queue_name(event_type_name: &str, handler_name: &str) -> String {
    format!(
        "{}.{}",
        default_routing_key(event_type_name),
        handler_name.to_lowercase()
    )
}

/// Immutable exchange list plus naming policy, built by [`TopologyBuilder`].
pub struct Topology {
    exchanges: Vec<ExchangeConfig>,
    routing_key_resolver: Option<NameResolver>,
    exchange_resolver: Option<NameResolver>,
}

impl Topology {
    pub fn builder() -> TopologyBuilder {
        TopologyBuilder::new()
    }

    /// All declared exchanges, in declaration order.
    pub fn exchanges(&self) -> &[ExchangeConfig] {
        &self.exchanges
    }

    /// Look up a declared exchange by name.
    pub fn exchange(&self, name: &str) -> Option<&ExchangeConfig> {
        self.exchanges.iter().find(|config| config.name == name)
    }

    /// Routing key for an event type: the configured resolver, falling back
    /// to [`default_routing_key`].
    pub fn routing_key(&self, event_type_name: &str) -> String {
        match &self.routing_key_resolver {
            Some(resolve) => resolve(event_type_name),
            None => default_routing_key(event_type_name),
        }
    }

    /// Exchange for an event type: the configured resolver, falling back to
    /// the single declared exchange when exactly one exists.
    pub fn exchange_for(&self, event_type_name: &str) -> Result<String, TopologyError> {
        if let Some(resolve) = &self.exchange_resolver {
            return Ok(resolve(event_type_name));
        }
        match self.exchanges.as_slice() {
            [single] => Ok(single.name.clone()),
            _ => Err(TopologyError::NoExchangeConfigured {
                type_name: event_type_name.to_string(),
            }),
        }
    }

    /// Queue name for an (event type, handler) subscription; see [`queue_name`].
    pub fn queue_name(&self, event_type_name: &str, handler_name: &str) -> String {
        queue_name(event_type_name, handler_name)
    }
}

/// Collects exchange declarations and resolver functions.
pub struct TopologyBuilder {
    exchanges: Vec<ExchangeConfig>,
    routing_key_resolver: Option<NameResolver>,
    exchange_resolver: Option<NameResolver>,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        TopologyBuilder {
            exchanges: Vec::new(),
            routing_key_resolver: None,
            exchange_resolver: None,
        }
    }

    /// Declare an exchange. Identical redeclaration is a no-op; conflicting
    /// parameters fail with `TopologyError::Conflict`.
    pub fn exchange(mut self, config: ExchangeConfig) -> Result<Self, TopologyError> {
        match self.exchanges.iter().find(|existing| existing.name == config.name) {
            Some(existing) if *existing == config => Ok(self),
            Some(_) => Err(TopologyError::Conflict { name: config.name }),
            None => {
                self.exchanges.push(config);
                Ok(self)
            }
        }
    }

    /// Override routing-key derivation with a resolver function.
    pub fn with_routing_key_resolver(
        mut self,
        resolver: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.routing_key_resolver = Some(Box::new(resolver));
        self
    }

    /// Override exchange selection with a resolver function.
    pub fn with_exchange_resolver(
        mut self,
        resolver: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.exchange_resolver = Some(Box::new(resolver));
        self
    }

    pub fn build(self) -> Topology {
        Topology {
            exchanges: self.exchanges,
            routing_key_resolver: self.routing_key_resolver,
            exchange_resolver: self.exchange_resolver,
        }
    }
}

impl Default for TopologyBuilder {
    fn default() -> Self {
        Self::new()
    }
}
