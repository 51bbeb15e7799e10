pub use self::{
    push::{Claims, PushHeader, PushMessage, PushTarget, Urgency},
    subscription::{
        DevicesQuery, Keys, Notify, NotifyTarget, NotifyTargeted,
        Subscription, Unsubscribe,
    },
};

mod push;
mod subscription;
