use serde_json::json;
use sman::prelude::*;
use std::error::Error;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

async fn plus(ctx: ActionContext, args: Args) -> ActionResult<UpdateMapping> {
    let num: i64 = args.get(0)?;
    let count = ctx.get_state().get("count").and_then(State::as_i64).unwrap_or(0);
    Ok(UpdateMapping::new().set("count", count + num)?)
}

async fn change_id(_ctx: ActionContext, args: Args) -> ActionResult<UpdateMapping> {
    let id: String = args.get(0)?;
    Ok(UpdateMapping::new().set("complex.arr.0.id", id)?)
}

/// Prints every update it receives.
struct Printer {
    name: &'static str,
    view: SliceSubscriber,
}

impl Subscriber for Printer {
    fn slice(&self) -> Slice {
        self.view.slice()
    }

    fn set_slice(&self, slice: Slice) {
        println!("{} <- {}", self.name, serde_json::to_string(&slice).unwrap_or_default());
        self.view.set_slice(slice);
    }

    fn seed(&self, slice: Slice) {
        self.view.seed(slice);
    }

    fn bind(&self, trigger: Trigger) {
        self.view.bind(trigger);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ManagerConfig::from_json_str(
        r#"{"state": {"count": 0, "complex": {"arr": [{"id": 1}]}}, "debug": true}"#,
    )?;
    let manager = StateManager::from_config(config);
    manager.register_action("PLUS", plus);
    manager.register_action("CHANGE_ID", change_id);

    let counter = Arc::new(Printer {
        name: "counter",
        view: SliceSubscriber::new(),
    });
    let everything = Arc::new(Printer {
        name: "everything",
        view: SliceSubscriber::new(),
    });
    manager
        .attach_state(&counter, ["count"])
        .attach_state(&everything, ["count", "complex"]);

    manager.trigger("PLUS", Args::one(10)).await?;
    manager.trigger("CHANGE_ID", Args::one("Homer Simpson")).await?;
    counter.view.trigger("PLUS", Args::one(1)).await?;
    manager.trigger("UNKNOWN", ()).await?;

    println!("final state: {}", manager.get_state());
    Ok(())
}
