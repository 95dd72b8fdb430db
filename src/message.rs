/// Message type identifier
pub type MHMessageId = u8;

/// Message delivered to state machines.
/// Typically an `enum` whose variants carry the payloads.
pub trait MHMessage
{
    fn message_id(&self) -> MHMessageId;
}

//

/// Router identifier
pub type MHRouterId = u8;

/// Destination meaning "every router".
pub const MH_ALL_ROUTERS: MHRouterId = MHRouterId::MAX;

/// Router id taken by message buses.
pub const MH_MESSAGE_BUS: MHRouterId = MHRouterId::MAX - 1;

/// Largest id a state machine or user router may take.
pub const MH_MAX_ROUTER: MHRouterId = MHRouterId::MAX - 2;

/// Anything a message can be routed to
pub trait MHRouter<M>
where M: MHMessage
{
    fn router_id(&self) -> MHRouterId;

    /// Gets if messages of this type are handled.
    fn accepts(&self, id: MHMessageId) -> bool;

    fn receive(&mut self, msg: &M);

    /// Delivers `msg` if `destination` names this router.
    fn receive_to(&mut self, destination: MHRouterId, msg: &M)
    {
        if destination == MH_ALL_ROUTERS || destination == self.router_id() {
            self.receive(msg);
        }
    }

    /// Gets if this router can be subscribed to a bus.
    fn is_consumer(&self) -> bool
    {
        true
    }

    fn is_bus(&self) -> bool
    {
        false
    }
}

//

/// Storage for messages raised while a state machine is busy.
/// See `MHHfsm::receive_all`.
pub trait MHDeferred<M>
{
    /// Keeps a message for later; hands it back if there is no room.
    fn defer(&mut self, msg: M) -> Result<(), M>;

    /// Takes the oldest kept message.
    fn recall(&mut self) -> Option<M>;
}
