//! App Router

use salvo::Router;

use crate::{bookings, internal, payments, rate_limit, slots, webhooks};

pub fn app_router() -> Router {
    Router::new()
        .push(Router::with_path("providers/{provider}/slots").get(slots::index::handler))
        .push(
            Router::with_path("bookings")
                .push(
                    Router::new()
                        .hoop(rate_limit::handler)
                        .post(bookings::create::handler),
                )
                .push(
                    Router::with_path("{booking}")
                        .get(bookings::get::handler)
                        .push(Router::with_path("deposit").post(payments::create_deposit::handler))
                        .push(
                            Router::with_path("balance")
                                .get(payments::balance::handler)
                                .post(payments::create_balance::handler),
                        ),
                ),
        )
        .push(
            Router::with_path("internal/bookings/{booking}")
                .hoop(internal::middleware::handler)
                .push(Router::with_path("confirm").post(internal::confirm::handler))
                .push(Router::with_path("cancel").post(internal::cancel::handler))
                .push(Router::with_path("complete").post(internal::complete::handler))
                .push(Router::with_path("payments").post(internal::record_payment::handler)),
        )
        .push(Router::with_path("webhooks/gateway").post(webhooks::gateway::handler))
}
