use std::sync::Arc;

use hiboot::inject::{Configuration, Dependency, Injectable, InjectionPoint, Providers};
use hiboot::{AppContext, Config};
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Deserialize)]
struct AppConfig {
    app: AppSection,
}

#[derive(Debug, Deserialize)]
struct AppSection {
    name: String,
}

trait Greeter: Send + Sync {
    fn greet(&self, who: &str) -> String;
}

struct TemplateGreeter {
    template: String,
}

impl Injectable for TemplateGreeter {}

impl Greeter for TemplateGreeter {
    fn greet(&self, who: &str) -> String {
        format!("{}, {who}!", self.template)
    }
}

#[derive(Debug, Deserialize)]
struct GreetingProperties {
    template: String,
    language: String,
}

struct GreetingConfiguration {
    properties: GreetingProperties,
}

impl Injectable for GreetingConfiguration {}

impl Configuration for GreetingConfiguration {
    const NAME: &'static str = "greeting";
    type Properties = GreetingProperties;

    fn new(properties: GreetingProperties) -> Self {
        Self { properties }
    }

    fn providers(providers: &mut Providers<Self>) {
        let greeter = providers
            .method("greeter", |cfg, _| {
                Ok(TemplateGreeter {
                    template: cfg.properties.template.clone(),
                })
            })
            .bind::<dyn Greeter, _>(|greeter| greeter as Arc<dyn Greeter>);
        providers.add(greeter);
    }
}

#[derive(Default)]
struct GreetingService {
    greeter: Option<Arc<dyn Greeter>>,
    language: String,
    profiles: Vec<String>,
}

impl Injectable for GreetingService {
    fn injection_points() -> Vec<InjectionPoint<Self>> {
        vec![
            InjectionPoint::inject("greeter", Dependency::new(), |s: &mut Self, g| s.greeter = Some(g)),
            InjectionPoint::value("language", "${greeting.language}", |s: &mut Self, l| s.language = l),
            InjectionPoint::value("profiles", "${app.profiles.include}", |s: &mut Self, p| s.profiles = p),
        ]
    }
}

fn main() -> Result<(), hiboot::Error> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hiboot=debug")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // APP_PROFILES_ACTIVE=dev picks up demos/application-dev.toml; HIBOOT__APP__NAME overrides app.name
    let properties = Config::builder()
        .with_active_profile("demos", "application")
        .with_env("HIBOOT", "__")
        .build_properties()?;

    let ctx = AppContext::builder()
        .with_config(properties.bind::<AppConfig>()?)
        .with_properties(properties)
        .auto_configuration::<GreetingConfiguration>()
        .build()?;

    let mut service = GreetingService::default();
    ctx.into_object(&mut service)?;

    if let Some(greeter) = &service.greeter {
        println!("{}", greeter.greet(&ctx.config().app.name));
    }
    println!("language: {}", service.language);
    println!("profiles: {}", service.profiles.join(", "));

    Ok(())
}
